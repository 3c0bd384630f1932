//! # Tuple
//!
//! SPEC §3.2 ("Tuple: `cell_type = tuple-item`...") and §4.2. A Tuple
//! carries one concrete instance of a Kind: named items, each a full tensor
//! Block, packed contiguously inside a single allocation.

use std::collections::BTreeMap;

use jazz_types::{CellType, StatusCode};

use crate::domain::block::{Block, HasNaPolicy, IndexMap};

/// One item inside a Tuple: a name, its concrete tensor, and the
/// hierarchical `level` produced by merging kinds (SPEC §4.2).
#[derive(Debug, Clone)]
pub struct TupleItem {
    pub name: String,
    pub block: Block,
    /// Offset (in bytes, relative to the tensor base) to this item's
    /// tensor — recorded by `add_item`, as the original's `ItemHeader`
    /// would carry `data_start`.
    pub data_start: i64,
    pub level: i32,
}

/// A Block instance of a Kind.
#[derive(Debug, Clone, Default)]
pub struct Tuple {
    items: Vec<TupleItem>,
    attrs: Vec<(i32, String)>,
    kind_attr: Option<i32>,
    closed: bool,
    next_data_start: i64,
}

impl Tuple {
    /// SPEC §4.2 `new_tuple(total_bytes)`.
    pub fn new_tuple(_total_bytes: usize) -> Self {
        Tuple::default()
    }

    /// SPEC §4.2 "repeated `add_item(block)` that appends a full Block
    /// after the item header array and records `data_start`."
    pub fn add_item(&mut self, name: impl Into<String>, block: Block) -> Result<(), StatusCode> {
        if self.closed {
            return Err(StatusCode::WrongArguments {
                reason: "add_item called on a closed tuple".into(),
            });
        }
        let data_start = self.next_data_start;
        self.next_data_start += block.header.total_bytes.max(block.header.size);
        self.items.push(TupleItem {
            name: name.into(),
            block,
            data_start,
            level: 0,
        });
        Ok(())
    }

    /// SPEC §4.2 `close_tuple(names, attrs, levels)`: finalise. Levels are
    /// applied in item order; callers that did not merge kinds may pass an
    /// all-zero slice.
    pub fn close_tuple(
        &mut self,
        levels: &[i32],
        attrs: &[(i32, &str)],
        kind_attr: Option<i32>,
    ) -> Result<(), StatusCode> {
        if levels.len() != self.items.len() {
            return Err(StatusCode::WrongArguments {
                reason: "levels length does not match item count".into(),
            });
        }
        for (item, &level) in self.items.iter_mut().zip(levels) {
            item.level = level;
        }
        self.attrs = attrs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        self.kind_attr = kind_attr;
        for item in &mut self.items {
            item.block.close_block(HasNaPolicy::Auto, item.block.header.created);
        }
        self.closed = true;
        Ok(())
    }

    pub fn items(&self) -> &[TupleItem] {
        &self.items
    }

    pub fn item(&self, name: &str) -> Option<&TupleItem> {
        self.items.iter().find(|i| i.name == name)
    }

    /// Mutable item lookup, used by `translate` (0-mq, bash) to write a
    /// reply's bytes into the `result` item in place.
    pub fn item_mut(&mut self, name: &str) -> Option<&mut TupleItem> {
        self.items.iter_mut().find(|i| i.name == name)
    }

    pub fn kind_attr(&self) -> Option<i32> {
        self.kind_attr
    }

    /// A `(item name -> cell type)` Index view of this Tuple, for callers
    /// that need a plain Block (e.g. `get(path, GetSelector::Whole)`)
    /// rather than item-by-item access.
    pub fn as_index_block(&self) -> Block {
        let mut map = BTreeMap::new();
        for item in &self.items {
            map.insert(item.name.clone(), format!("{:?}", item.block.header.cell_type));
        }
        let mut block = Block::new_index(IndexMap::StringToString(map));
        block.close_block(HasNaPolicy::False, 0);
        block
    }
}

/// Merge two kinds' item lists into one, mechanically applying SPEC §4.2's
/// naming/level rule: "merging kinds X=(a,b) and scalar f into (f,X) yields
/// items (f@0, X_a@1, X_b@1) — the underscore naming and level arithmetic
/// are mechanical."
///
/// `outer` items are emitted first at level 0; each `inner` item is emitted
/// as `"{inner_kind_name}_{item_name}"` at level 1. This generalizes beyond
/// two-kind merges: callers fold repeatedly for deeper nesting, bumping
/// `base_level` each time.
pub fn merge_item_names(
    outer: &[(String, CellType)],
    inner_kind_name: &str,
    inner: &[(String, CellType)],
    base_level: i32,
) -> Vec<(String, CellType, i32)> {
    let mut out: Vec<(String, CellType, i32)> = outer
        .iter()
        .map(|(n, t)| (n.clone(), *t, base_level))
        .collect();
    out.extend(
        inner
            .iter()
            .map(|(n, t)| (format!("{inner_kind_name}_{n}"), *t, base_level + 1)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::MAX_RANK;

    #[test]
    fn add_item_tracks_data_start_contiguously() {
        let mut t = Tuple::new_tuple(4096);
        let mut dim = [0i32; MAX_RANK];
        dim[0] = 4;
        let b1 = Block::new_tensor(CellType::Integer, dim);
        let b2 = Block::new_tensor(CellType::Double, dim);
        t.add_item("a", b1).unwrap();
        t.add_item("b", b2).unwrap();
        assert_eq!(t.items()[0].data_start, 0);
        assert!(t.items()[1].data_start > 0);
    }

    #[test]
    fn close_tuple_requires_matching_level_count() {
        let mut t = Tuple::new_tuple(4096);
        t.add_item("a", Block::new_tensor(CellType::Integer, [1, 0, 0, 0, 0, 0]))
            .unwrap();
        assert!(t.close_tuple(&[0, 0], &[], None).is_err());
        assert!(t.close_tuple(&[0], &[], None).is_ok());
    }

    #[test]
    fn merge_item_names_applies_underscore_and_level_rule() {
        let outer = vec![("f".to_string(), CellType::Double)];
        let inner = vec![
            ("a".to_string(), CellType::Integer),
            ("b".to_string(), CellType::Integer),
        ];
        let merged = merge_item_names(&outer, "X", &inner, 0);
        assert_eq!(merged[0].0, "f");
        assert_eq!(merged[0].2, 0);
        assert_eq!(merged[1].0, "X_a");
        assert_eq!(merged[1].2, 1);
        assert_eq!(merged[2].0, "X_b");
        assert_eq!(merged[2].2, 1);
    }
}
