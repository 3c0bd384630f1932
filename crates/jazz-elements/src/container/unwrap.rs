//! # Unwrap-received
//!
//! SPEC §4.3 "every boundary read (LMDB value, file contents, HTTP body,
//! 0-mq reply) is handed to a single routine before anything else touches
//! it": if the bytes parse as a valid, hash-verified Block of exactly the
//! declared size, install it as-is; else if they form a NUL-terminated C
//! string, wrap them as a one-cell `CellType::String` Block; otherwise wrap
//! them as a raw `CellType::Byte` tensor. This never fails — a boundary read
//! always produces *some* Block, which is the point: callers no longer
//! branch on "is this raw or hashed", they just call `get`.

use crate::domain::{Block, HasNaPolicy};
use jazz_types::CellType;

/// Classify and install `bytes` as a Block. `created` is the timestamp to
/// stamp if a fresh Block has to be built (the hashed-Block case keeps its
/// own `created` field untouched).
pub fn unwrap_received(bytes: &[u8], created: i64) -> Block {
    if let Some(block) = try_as_hashed_block(bytes) {
        return block;
    }
    if let Some(s) = try_as_c_string(bytes) {
        return wrap_as_string(&s, created);
    }
    wrap_as_byte_tensor(bytes, created)
}

fn try_as_hashed_block(bytes: &[u8]) -> Option<Block> {
    let block = Block::from_bytes(bytes).ok()?;
    if !block.check_hash() {
        return None;
    }
    Some(block)
}

/// A buffer is a "C string" for unwrap purposes when it is exactly one
/// NUL-terminated run: the NUL appears once, at the very end, and
/// everything before it is valid UTF-8. Anything else (embedded NULs,
/// invalid UTF-8, no terminator) falls through to the raw byte-tensor case.
fn try_as_c_string(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || *bytes.last()? != 0 {
        return None;
    }
    let body = &bytes[..bytes.len() - 1];
    if body.contains(&0) {
        return None;
    }
    std::str::from_utf8(body).ok().map(str::to_string)
}

fn wrap_as_string(s: &str, created: i64) -> Block {
    let mut block = Block::new_tensor(CellType::String, [1, 0, 0, 0, 0, 0]);
    let offset = block.intern_string(s);
    if let Some(tensor) = block.tensor_bytes_mut() {
        tensor[0..4].copy_from_slice(&offset.to_le_bytes());
    }
    block.close_block(HasNaPolicy::Auto, created);
    block
}

fn wrap_as_byte_tensor(bytes: &[u8], created: i64) -> Block {
    let mut block = Block::new_tensor(CellType::Byte, [bytes.len() as i32, 0, 0, 0, 0, 0]);
    if let Some(tensor) = block.tensor_bytes_mut() {
        tensor.copy_from_slice(bytes);
    }
    block.close_block(HasNaPolicy::False, created);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_valid_hashed_block_unchanged() {
        let mut original = Block::new_tensor(CellType::Integer, [2, 0, 0, 0, 0, 0]);
        if let Some(t) = original.tensor_bytes_mut() {
            t[0..4].copy_from_slice(&7i32.to_le_bytes());
            t[4..8].copy_from_slice(&9i32.to_le_bytes());
        }
        original.close_block(HasNaPolicy::Auto, 55);
        let wire = original.to_bytes();

        let recovered = unwrap_received(&wire, 999);
        assert_eq!(recovered.header.created, 55);
        assert_eq!(recovered.tensor_bytes(), original.tensor_bytes());
    }

    #[test]
    fn a_corrupted_hashed_block_falls_through_to_byte_tensor() {
        let mut original = Block::new_tensor(CellType::Integer, [2, 0, 0, 0, 0, 0]);
        original.close_block(HasNaPolicy::False, 1);
        let mut wire = original.to_bytes();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF; // corrupt a string-buffer byte, hash no longer matches

        let recovered = unwrap_received(&wire, 42);
        assert_eq!(recovered.header.cell_type, CellType::Byte);
        assert_eq!(recovered.header.created, 42);
    }

    #[test]
    fn nul_terminated_text_becomes_a_string_cell() {
        let mut bytes = b"hello world".to_vec();
        bytes.push(0);

        let block = unwrap_received(&bytes, 10);
        assert_eq!(block.header.cell_type, CellType::String);
        let offset = i32::from_le_bytes(block.tensor_bytes().unwrap()[0..4].try_into().unwrap());
        assert_eq!(block.get_string_at(offset), Some("hello world"));
    }

    #[test]
    fn arbitrary_binary_wraps_as_a_byte_tensor() {
        let bytes = vec![0x01, 0x02, 0xFF, 0x00, 0x10];
        let block = unwrap_received(&bytes, 3);
        assert_eq!(block.header.cell_type, CellType::Byte);
        assert_eq!(block.tensor_bytes(), Some(bytes.as_slice()));
    }
}
