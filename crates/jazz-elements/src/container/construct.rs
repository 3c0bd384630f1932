//! # Shared block-construction helpers
//!
//! SPEC §4.3's eight `new_block` allocation forms build a pure `Block`
//! value the same way regardless of which medium (Volatile, Persisted,
//! Channels) ends up holding it — only admission control (`AllocAccounting`)
//! and the transaction pool differ per adapter. Factored out here so the
//! three `Container` implementations share one construction path instead of
//! three copies that could drift.

use jazz_types::{CellType, StatusCode};

use crate::domain::block::{apply_filter, Block, HasNaPolicy, IndexMap, Payload};
use crate::domain::{Kind, Transaction, Tuple};

use super::parser::{format_block_text, parse_block_text};

/// Form 1: a zero-filled tensor of `cell_type`/`dim`.
pub fn tensor_block(cell_type: CellType, dim: [i32; 6], created: i64) -> Block {
    let mut block = Block::new_tensor(cell_type, dim);
    block.close_block(HasNaPolicy::False, created);
    block
}

/// Form 2: assemble a Kind's skeleton block.
pub fn kind_block(mut kind: Kind) -> Result<Block, StatusCode> {
    kind.audit()?;
    kind.close();
    Ok(kind.block)
}

/// Form 3: a tensor filtered by a row-filter Block.
pub fn filtered_block(source: &Block, filter: &Block) -> Result<Block, StatusCode> {
    apply_filter(source, filter)
}

/// Form 4: a tensor extracted from a Tuple by item name.
pub fn item_block(tuple_txn: &Transaction, item_name: &str) -> Result<Block, StatusCode> {
    let tuple = tuple_txn.tuple.as_ref().ok_or_else(|| StatusCode::WrongArguments {
        reason: "transaction does not hold a Tuple".into(),
    })?;
    let item = tuple
        .item(item_name)
        .ok_or_else(|| StatusCode::WrongName { name: item_name.to_string() })?;
    Ok(item.block.clone())
}

/// Form 5: parsed from a bracketed text representation, optionally checked
/// against a provided Kind's sole item.
pub fn parsed_block(text: &[u8], kind: Option<&Kind>) -> Result<Block, StatusCode> {
    let block = parse_block_text(text)?;
    if let Some(k) = kind {
        if let Some(item) = k.items().first() {
            if item.cell_type != block.header.cell_type {
                return Err(StatusCode::WrongType {
                    expected: "cell type matching the checked kind's sole item",
                    got: "parsed block cell type differs",
                });
            }
        }
    }
    Ok(block)
}

/// Form 6: serialised to a byte tensor using a printf-style cell format.
pub fn serialized_block(source: &Block, format: &str, created: i64) -> Result<Block, StatusCode> {
    let text = format_block_text(source, format)?;
    let mut block = Block::new_tensor(CellType::Byte, [text.len() as i32, 0, 0, 0, 0, 0]);
    if let Some(bytes) = block.tensor_bytes_mut() {
        bytes.copy_from_slice(&text);
    }
    block.close_block(HasNaPolicy::False, created);
    Ok(block)
}

/// Form 7: an empty Index of one of the four flavours.
pub fn index_block(cell_type: CellType, created: i64) -> Result<Block, StatusCode> {
    let map = match cell_type {
        CellType::IndexIntToInt => IndexMap::IntToInt(Default::default()),
        CellType::IndexIntToString => IndexMap::IntToString(Default::default()),
        CellType::IndexStringToInt => IndexMap::StringToInt(Default::default()),
        CellType::IndexStringToString => IndexMap::StringToString(Default::default()),
        _ => {
            return Err(StatusCode::WrongType {
                expected: "one of the four Index cell types",
                got: "a non-index cell type",
            })
        }
    };
    let mut block = Block::new_index(map);
    block.close_block(HasNaPolicy::False, created);
    Ok(block)
}

/// Form 8: a `(key:STRING, value:STRING)` Tuple materialised from a
/// string-to-string Index. Returns both the Tuple (for later item lookups)
/// and a Block view of it (for whole-block reads).
pub fn tuple_from_index(index_txn: &Transaction, created: i64) -> Result<(Tuple, Block), StatusCode> {
    let block = index_txn.block.as_ref().ok_or(StatusCode::BlockNotFound)?;
    let Payload::Index(IndexMap::StringToString(map)) = &block.payload else {
        return Err(StatusCode::WrongType {
            expected: "a string-to-string Index block",
            got: "some other payload",
        });
    };

    let mut tuple = Tuple::new_tuple(0);
    for (key, value) in map {
        let mut item = Block::new_tensor(CellType::String, [1, 0, 0, 0, 0, 0]);
        let offset = item.intern_string(value);
        if let Some(bytes) = item.tensor_bytes_mut() {
            bytes[0..4].copy_from_slice(&offset.to_le_bytes());
        }
        item.close_block(HasNaPolicy::Auto, created);
        tuple.add_item(key.clone(), item)?;
    }
    let levels = vec![0; tuple.items().len()];
    tuple.close_tuple(&levels, &[], None)?;
    let view = tuple.as_index_block();
    Ok((tuple, view))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_block_is_closed_and_hash_checks() {
        let b = tensor_block(CellType::Integer, [4, 0, 0, 0, 0, 0], 7);
        assert!(b.check_hash());
        assert_eq!(b.header.created, 7);
    }

    #[test]
    fn tuple_from_index_round_trips_through_item_block() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("a".to_string(), "1".to_string());
        let mut index_block = Block::new_index(IndexMap::StringToString(map));
        index_block.close_block(HasNaPolicy::False, 0);
        let mut index_txn = Transaction::empty("test");
        index_txn.attach(index_block);

        let (tuple, view) = tuple_from_index(&index_txn, 0).unwrap();
        assert!(view.check_hash());
        let mut tuple_txn = Transaction::empty("test");
        tuple_txn.attach_tuple(tuple, view);

        let item = item_block(&tuple_txn, "a").unwrap();
        assert_eq!(item.header.cell_type, CellType::String);
    }
}
