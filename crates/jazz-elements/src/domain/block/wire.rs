//! # Wire (byte-image) encoding
//!
//! SPEC §6 "Wire formats: blocks travel as their in-memory byte image (the
//! self-describing block including the header hash). Peers verify with
//! `check_hash` before trusting." This module is the concrete `to_bytes` /
//! `from_bytes` pair Persisted's LMDB adapter, Channels' `file`/`http`
//! media, and `unwrap_received` all share — the single place that knows the
//! exact byte layout travelling between Jazz nodes and files.
//!
//! The layout mirrors SPEC §3.2's ordering (header, tensor, attribute
//! table, string buffer) but is otherwise this crate's own concrete
//! encoding, not a byte-for-byte port of the original's in-memory C++
//! struct layout — `hash64` is recomputed from logical content
//! (`Block::hashable_bytes`), not from these wire bytes, so the two
//! concerns stay decoupled.

use std::collections::BTreeMap;

use jazz_types::{CellType, StatusCode};

use super::attributes::AttributeTable;
use super::block::{Block, IndexMap, Payload};
use super::header::{BlockHeader, MAX_RANK};
use super::strings::StringBuffer;

const MAGIC: &[u8; 4] = b"JZB1";

impl Block {
    /// Serialize this Block to its self-describing byte image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.total_bytes.max(64) as usize);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(self.header.cell_type as i32).to_le_bytes());
        out.extend_from_slice(&self.header.size.to_le_bytes());
        out.extend_from_slice(&self.header.created.to_le_bytes());
        out.push(self.header.rank);
        for d in &self.header.dim {
            out.extend_from_slice(&d.to_le_bytes());
        }
        out.extend_from_slice(&self.header.total_bytes.to_le_bytes());
        out.push(self.header.has_na as u8);
        out.extend_from_slice(&self.header.hash64.to_le_bytes());

        match &self.payload {
            Payload::Tensor(bytes) => {
                out.push(0);
                out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                out.extend_from_slice(bytes);
            }
            Payload::Index(map) => {
                out.push(1);
                write_index_map(&mut out, map);
            }
        }

        out.extend_from_slice(&(self.attributes.len() as u32).to_le_bytes());
        for (k, v) in self.attributes.iter() {
            out.extend_from_slice(&k.to_le_bytes());
            out.extend_from_slice(&v.to_le_bytes());
        }

        let str_bytes = self.strings.as_bytes();
        out.extend_from_slice(&(str_bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(str_bytes);
        out
    }

    /// Inverse of [`Block::to_bytes`]. Returns `BadBlock` on any structural
    /// mismatch (truncated buffer, bad magic, length that doesn't agree
    /// with what was declared) — SPEC §7 "Hash and audit failures log at
    /// WARN and return BAD_BLOCK."
    pub fn from_bytes(bytes: &[u8]) -> Result<Block, StatusCode> {
        let mut r = Reader::new(bytes);
        if r.take(4)? != MAGIC {
            return Err(bad_block("bad magic"));
        }
        let cell_type = cell_type_from_i32(r.i32()?)?;
        let size = r.i64()?;
        let created = r.i64()?;
        let rank = r.u8()?;
        let mut dim = [0i32; MAX_RANK];
        for d in dim.iter_mut() {
            *d = r.i32()?;
        }
        let total_bytes = r.i64()?;
        let has_na = r.u8()? != 0;
        let hash64 = r.u64()?;

        let payload_kind = r.u8()?;
        let payload = if payload_kind == 0 {
            let len = r.u64()? as usize;
            Payload::Tensor(r.take(len)?.to_vec())
        } else {
            Payload::Index(read_index_map(&mut r, cell_type)?)
        };

        let num_attrs = r.u32()? as usize;
        let mut attrs = AttributeTable::new();
        let mut pairs: Vec<(i32, i32)> = Vec::with_capacity(num_attrs);
        for _ in 0..num_attrs {
            let k = r.i32()?;
            let v = r.i32()?;
            pairs.push((k, v));
        }

        let str_len = r.u64()? as usize;
        let str_bytes = r.take(str_len)?;
        let strings = StringBuffer::from_raw(str_bytes.to_vec());

        // The attribute table's `set_all` interns by value, but these
        // offsets are already resolved against `strings` — install them
        // directly rather than re-interning.
        attrs.install_raw(pairs);

        let header = BlockHeader {
            cell_type,
            size,
            created,
            rank,
            dim,
            num_attributes: num_attrs as i32,
            total_bytes,
            has_na,
            hash64,
        };

        let block = Block {
            header,
            payload,
            attributes: attrs,
            strings,
        };
        Ok(block)
    }
}

fn bad_block(reason: &str) -> StatusCode {
    StatusCode::BadBlock {
        reason: reason.to_string(),
    }
}

fn cell_type_from_i32(v: i32) -> Result<CellType, StatusCode> {
    Ok(match v {
        0 => CellType::Byte,
        1 => CellType::ByteBoolean,
        2 => CellType::Integer,
        3 => CellType::Factor,
        4 => CellType::Grade,
        5 => CellType::Boolean,
        6 => CellType::Single,
        7 => CellType::String,
        8 => CellType::LongInteger,
        9 => CellType::Time,
        10 => CellType::Double,
        11 => CellType::TupleItem,
        12 => CellType::KindItem,
        13 => CellType::IndexIntToInt,
        14 => CellType::IndexIntToString,
        15 => CellType::IndexStringToInt,
        16 => CellType::IndexStringToString,
        _ => return Err(bad_block("unknown cell_type discriminant")),
    })
}

fn write_index_map(out: &mut Vec<u8>, map: &IndexMap) {
    out.extend_from_slice(&(map.len() as u64).to_le_bytes());
    match map {
        IndexMap::IntToInt(m) => {
            for (k, v) in m {
                out.extend_from_slice(&k.to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        IndexMap::IntToString(m) => {
            for (k, v) in m {
                out.extend_from_slice(&k.to_le_bytes());
                write_string(out, v);
            }
        }
        IndexMap::StringToInt(m) => {
            for (k, v) in m {
                write_string(out, k);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        IndexMap::StringToString(m) => {
            for (k, v) in m {
                write_string(out, k);
                write_string(out, v);
            }
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn read_index_map(r: &mut Reader, cell_type: CellType) -> Result<IndexMap, StatusCode> {
    let count = r.u64()? as usize;
    Ok(match cell_type {
        CellType::IndexIntToInt => {
            let mut m = BTreeMap::new();
            for _ in 0..count {
                m.insert(r.i64()?, r.i64()?);
            }
            IndexMap::IntToInt(m)
        }
        CellType::IndexIntToString => {
            let mut m = BTreeMap::new();
            for _ in 0..count {
                let k = r.i64()?;
                let v = r.string()?;
                m.insert(k, v);
            }
            IndexMap::IntToString(m)
        }
        CellType::IndexStringToInt => {
            let mut m = BTreeMap::new();
            for _ in 0..count {
                let k = r.string()?;
                let v = r.i64()?;
                m.insert(k, v);
            }
            IndexMap::StringToInt(m)
        }
        CellType::IndexStringToString => {
            let mut m = BTreeMap::new();
            for _ in 0..count {
                let k = r.string()?;
                let v = r.string()?;
                m.insert(k, v);
            }
            IndexMap::StringToString(m)
        }
        _ => return Err(bad_block("non-index cell_type with index payload tag")),
    })
}

/// Minimal cursor over a byte slice, returning `BadBlock` on truncation
/// instead of panicking — every boundary read in Jazz must survive a
/// corrupt or truncated input (SPEC §7).
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StatusCode> {
        if self.pos + len > self.bytes.len() {
            return Err(bad_block("truncated block buffer"));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, StatusCode> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, StatusCode> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, StatusCode> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, StatusCode> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, StatusCode> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String, StatusCode> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| bad_block("string is not valid utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::HasNaPolicy;

    #[test]
    fn tensor_block_round_trips_bytewise_and_hash_holds() {
        let mut b = Block::new_tensor(CellType::Integer, [4, 0, 0, 0, 0, 0]);
        if let Payload::Tensor(bytes) = &mut b.payload {
            for (i, v) in [1i32, 2, 3, 4].iter().enumerate() {
                bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        b.close_block(HasNaPolicy::Auto, 42);

        let wire = b.to_bytes();
        let back = Block::from_bytes(&wire).unwrap();
        assert_eq!(back.header.hash64, b.header.hash64);
        assert!(back.check_hash());
        assert_eq!(back.tensor_bytes(), b.tensor_bytes());
    }

    #[test]
    fn index_block_round_trips() {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), "1".to_string());
        m.insert("b".to_string(), "2".to_string());
        let mut b = Block::new_index(IndexMap::StringToString(m));
        b.close_block(HasNaPolicy::False, 0);

        let wire = b.to_bytes();
        let back = Block::from_bytes(&wire).unwrap();
        assert!(back.check_hash());
        assert_eq!(back.payload, b.payload);
    }

    #[test]
    fn truncated_buffer_is_bad_block_not_a_panic() {
        let b = Block::new_tensor(CellType::Integer, [4, 0, 0, 0, 0, 0]);
        let wire = b.to_bytes();
        let truncated = &wire[..wire.len() - 3];
        assert!(matches!(Block::from_bytes(truncated), Err(StatusCode::BadBlock { .. })));
    }
}
