//! # Block
//!
//! SPEC §3.2, §4.1. A Block is a pure value: header + tensor (or, for the
//! four Index cell types, a map payload) + attribute table + string buffer.
//! No I/O happens here; callers own allocation and lifetime (SPEC §9 "Block
//! is a pure value... Transaction owns either a heap Block or a read-txn
//! scoped borrow").
//!
//! The tensor/Index split is expressed as a tagged sum per SPEC §9 "Dynamic
//! vs static blocks", rather than a C-style union.

use std::collections::BTreeMap;

use jazz_types::{murmur_hash64a, CellType, NA_BOOLEAN, NA_DOUBLE_PAYLOAD};

use super::attributes::AttributeTable;
use super::header::{BlockHeader, MAX_RANK};
use super::strings::StringBuffer;

/// Whether a freshly-closed block should record that it contains NA cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasNaPolicy {
    False,
    True,
    /// Run `find_NAs_in_tensor` and use the observed result.
    Auto,
}

/// The map payload backing the four Index cell types (SPEC §4.6, GLOSSARY
/// "Index"). Not a dense tensor; resolved entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexMap {
    IntToInt(BTreeMap<i64, i64>),
    IntToString(BTreeMap<i64, String>),
    StringToInt(BTreeMap<String, i64>),
    StringToString(BTreeMap<String, String>),
}

impl IndexMap {
    pub fn cell_type(&self) -> CellType {
        match self {
            IndexMap::IntToInt(_) => CellType::IndexIntToInt,
            IndexMap::IntToString(_) => CellType::IndexIntToString,
            IndexMap::StringToInt(_) => CellType::IndexStringToInt,
            IndexMap::StringToString(_) => CellType::IndexStringToString,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexMap::IntToInt(m) => m.len(),
            IndexMap::IntToString(m) => m.len(),
            IndexMap::StringToInt(m) => m.len(),
            IndexMap::StringToString(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The variant payload of a Block: a dense tensor of raw cell bytes, or an
/// Index map. Destruction dispatches on this tag (SPEC §9).
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Tensor(Vec<u8>),
    Index(IndexMap),
}

/// Result of `filter_audit` (SPEC §3.2, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    NotAFilter,
    ByteBoolean,
    Integer,
}

/// A single contiguous, self-describing, hashable value.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Payload,
    pub attributes: AttributeTable,
    pub strings: StringBuffer,
}

impl Block {
    /// Construct a tensor Block of `cell_type` and `dim`, zero-filled.
    /// Mirrors `new_block` form 1 at the Block layer (allocation/fill-mode
    /// belongs to the Container; this is the pure-value constructor it
    /// calls into).
    pub fn new_tensor(cell_type: CellType, dim: [i32; MAX_RANK]) -> Self {
        let (rank, dim, size) = normalize_dimensions(dim);
        let bytes = size as usize * cell_type.cell_size();
        let header = BlockHeader {
            cell_type,
            size,
            created: 0,
            rank,
            dim,
            num_attributes: 0,
            total_bytes: 0,
            has_na: false,
            hash64: 0,
        };
        Block {
            header,
            payload: Payload::Tensor(vec![0u8; bytes]),
            attributes: AttributeTable::new(),
            strings: StringBuffer::new(1 << 20),
        }
    }

    /// Construct an Index Block from an already-built map.
    pub fn new_index(map: IndexMap) -> Self {
        let cell_type = map.cell_type();
        let header = BlockHeader {
            cell_type,
            size: map.len() as i64,
            created: 0,
            rank: 1,
            dim: [map.len() as i32, 0, 0, 0, 0, 0],
            num_attributes: 0,
            total_bytes: 0,
            has_na: false,
            hash64: 0,
        };
        Block {
            header,
            payload: Payload::Index(map),
            attributes: AttributeTable::new(),
            strings: StringBuffer::new(1 << 16),
        }
    }

    pub fn tensor_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Tensor(b) => Some(b),
            Payload::Index(_) => None,
        }
    }

    pub fn tensor_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.payload {
            Payload::Tensor(b) => Some(b),
            Payload::Index(_) => None,
        }
    }

    /// Compute the byte offset of `idx` within the tensor, given the
    /// header's `dim`/`rank`. SPEC §4.1 `get_offset`.
    pub fn get_offset(&self, idx: &[i32]) -> Option<i64> {
        if idx.len() != self.header.rank as usize {
            return None;
        }
        let strides = strides_of(&self.header.dim, self.header.rank);
        let mut off: i64 = 0;
        for (i, &ix) in idx.iter().enumerate() {
            if ix < 0 || ix >= self.header.dim[i] {
                return None;
            }
            off += ix as i64 * strides[i];
        }
        Some(off)
    }

    /// Inverse of `get_offset`. SPEC §4.1 `get_index`.
    pub fn get_index(&self, mut off: i64) -> Option<Vec<i32>> {
        if off < 0 || off >= self.header.size {
            return None;
        }
        let rank = self.header.rank as usize;
        let strides = strides_of(&self.header.dim, self.header.rank);
        let mut idx = vec![0i32; rank];
        for i in 0..rank {
            idx[i] = (off / strides[i].max(1)) as i32;
            off %= strides[i].max(1);
        }
        Some(idx)
    }

    pub fn validate_index(&self, idx: &[i32]) -> bool {
        self.get_offset(idx).is_some()
    }

    pub fn validate_offset(&self, off: i64) -> bool {
        off >= 0 && off < self.header.size
    }

    /// Read a string cell (SPEC §4.1 `get_string`). Only meaningful for
    /// `CellType::String` tensors; the offset is looked up in the block's
    /// own string buffer, never an external pointer.
    pub fn get_string_at(&self, off: i32) -> Option<&str> {
        self.strings.get(off)
    }

    /// Intern `s` and return its offset, as `set_string` would store into a
    /// `CellType::String` tensor cell.
    pub fn intern_string(&mut self, s: &str) -> i32 {
        self.strings.intern(s)
    }

    /// SPEC §4.1 `find_NAs_in_tensor`: linear scan for any cell equal to its
    /// type's NA sentinel. Always `false` for `Payload::Index` and for
    /// `CellType::Byte`, which has no NA domain.
    pub fn find_nas_in_tensor(&self) -> bool {
        let Payload::Tensor(bytes) = &self.payload else {
            return false;
        };
        if !self.header.cell_type.has_na_domain() {
            return false;
        }
        match self.header.cell_type {
            CellType::ByteBoolean => bytes.iter().any(|&b| b == 0xFF),
            CellType::Integer | CellType::Factor | CellType::Grade => bytes
                .chunks_exact(4)
                .any(|c| i32::from_le_bytes(c.try_into().unwrap()) == i32::MIN),
            CellType::Boolean => bytes
                .chunks_exact(4)
                .any(|c| u32::from_le_bytes(c.try_into().unwrap()) == NA_BOOLEAN),
            CellType::Single => bytes
                .chunks_exact(4)
                .any(|c| f32::from_le_bytes(c.try_into().unwrap()).is_nan()),
            CellType::String => bytes
                .chunks_exact(4)
                .any(|c| i32::from_le_bytes(c.try_into().unwrap()) == 0),
            CellType::LongInteger => bytes
                .chunks_exact(8)
                .any(|c| i64::from_le_bytes(c.try_into().unwrap()) == i64::MIN),
            CellType::Time => bytes
                .chunks_exact(8)
                .any(|c| i64::from_le_bytes(c.try_into().unwrap()) == 0),
            CellType::Double => bytes.chunks_exact(8).any(|c| {
                let bits = u64::from_le_bytes(c.try_into().unwrap());
                f64::from_bits(bits).is_nan() && (bits & 0xFFFF) == NA_DOUBLE_PAYLOAD
            }),
            CellType::Byte | CellType::TupleItem | CellType::KindItem => false,
            _ => false,
        }
    }

    /// SPEC §3.2 "Filters are Blocks of rank 1 with either byte-boolean
    /// cells (length == rows) or sorted strictly-increasing i32 cells in
    /// `[0, rows)`." `rows` is the axis-0 extent of the tensor being
    /// filtered; pass it in so the length check is against the *target*,
    /// not the filter's own size.
    pub fn filter_audit(&self, rows: i64) -> FilterKind {
        if self.header.rank != 1 {
            return FilterKind::NotAFilter;
        }
        let Payload::Tensor(bytes) = &self.payload else {
            return FilterKind::NotAFilter;
        };
        match self.header.cell_type {
            CellType::ByteBoolean => {
                if self.header.size == rows {
                    FilterKind::ByteBoolean
                } else {
                    FilterKind::NotAFilter
                }
            }
            CellType::Integer => {
                let mut prev: Option<i32> = None;
                for chunk in bytes.chunks_exact(4) {
                    let v = i32::from_le_bytes(chunk.try_into().unwrap());
                    if v < 0 || v as i64 >= rows {
                        return FilterKind::NotAFilter;
                    }
                    if let Some(p) = prev {
                        if v <= p {
                            return FilterKind::NotAFilter;
                        }
                    }
                    prev = Some(v);
                }
                FilterKind::Integer
            }
            _ => FilterKind::NotAFilter,
        }
    }

    /// SPEC §4.1 `close_block`: finalize the block, recompute `hash64` over
    /// `[tensor, end)`, stamp `created`, and resolve `has_NA_policy`.
    ///
    /// `CellType::Byte` has no NA sentinel (SPEC §3.1); requesting
    /// `HasNaPolicy::True` on one is satisfiable only vacuously, so we log
    /// and force `has_NA = false` (SPEC_FULL.md §12.1, resolving the Open
    /// Question at SPEC §9).
    pub fn close_block(&mut self, has_na_policy: HasNaPolicy, created: i64) {
        let has_na = match has_na_policy {
            HasNaPolicy::False => false,
            HasNaPolicy::True => {
                if self.header.cell_type == CellType::Byte {
                    tracing::warn!(
                        "close_block(SET_HAS_NA_TRUE) requested on a byte tensor; byte has no NA domain, forcing has_NA=false"
                    );
                    false
                } else {
                    true
                }
            }
            HasNaPolicy::Auto => self.find_nas_in_tensor(),
        };

        self.header.has_na = has_na;
        self.header.created = created;
        self.recompute_total_bytes();
        self.header.hash64 = self.compute_hash();
    }

    /// SPEC §4.1 `check_hash`: re-hash and compare against the stored value.
    pub fn check_hash(&self) -> bool {
        self.compute_hash() == self.header.hash64
    }

    fn compute_hash(&self) -> u64 {
        let hashed = self.hashable_bytes();
        murmur_hash64a(&hashed, 0)
    }

    /// The byte extent `[tensor, end)` that `hash64` covers: tensor bytes,
    /// attribute table, then string buffer — everything after the header.
    fn hashable_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match &self.payload {
            Payload::Tensor(bytes) => out.extend_from_slice(bytes),
            Payload::Index(map) => out.extend(index_map_bytes(map)),
        }
        for (k, v) in self.attributes.iter() {
            out.extend_from_slice(&k.to_le_bytes());
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(self.strings.as_bytes());
        out
    }

    fn recompute_total_bytes(&mut self) {
        let header_sz = std::mem::size_of::<BlockHeader>();
        let tensor_sz = match &self.payload {
            Payload::Tensor(b) => b.len(),
            Payload::Index(m) => index_map_bytes(m).len(),
        };
        let attr_sz = self.attributes.len() * 8;
        self.header.total_bytes =
            (header_sz + tensor_sz + attr_sz + self.strings.len()) as i64;
    }
}

fn index_map_bytes(map: &IndexMap) -> Vec<u8> {
    let mut out = Vec::new();
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
                out.extend_from_slice(v.as_bytes());
                out.push(0);
            }
        }
        IndexMap::StringToInt(m) => {
            for (k, v) in m {
                out.extend_from_slice(k.as_bytes());
                out.push(0);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        IndexMap::StringToString(m) => {
            for (k, v) in m {
                out.extend_from_slice(k.as_bytes());
                out.push(0);
                out.extend_from_slice(v.as_bytes());
                out.push(0);
            }
        }
    }
    out
}

/// SPEC §4.1 `set_dimensions`: "If every input dim is zero, rank is forced
/// to 1 and size to 0. Trailing zeros collapse rank." Returns `(rank, dim,
/// size)`.
fn normalize_dimensions(dim: [i32; MAX_RANK]) -> (u8, [i32; MAX_RANK], i64) {
    if dim.iter().all(|&d| d == 0) {
        return (1, [0; MAX_RANK], 0);
    }
    let mut rank = MAX_RANK;
    while rank > 1 && dim[rank - 1] == 0 {
        rank -= 1;
    }
    let size: i64 = dim[..rank].iter().map(|&d| d.max(0) as i64).product();
    (rank as u8, dim, size)
}

/// Row-major stride table: `strides[a]` is the cell count between
/// consecutive indices along axis `a`.
fn strides_of(dim: &[i32; MAX_RANK], rank: u8) -> [i64; MAX_RANK] {
    let rank = rank as usize;
    let mut strides = [0i64; MAX_RANK];
    let mut acc: i64 = 1;
    for a in (0..rank).rev() {
        strides[a] = acc;
        acc *= dim[a] as i64;
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_dims_collapse_to_rank_one_size_zero() {
        let b = Block::new_tensor(CellType::Integer, [0; MAX_RANK]);
        assert_eq!(b.header.rank, 1);
        assert_eq!(b.header.size, 0);
    }

    #[test]
    fn offset_and_index_roundtrip() {
        let b = Block::new_tensor(CellType::Integer, [4, 2, 0, 0, 0, 0]);
        for off in 0..b.header.size {
            let idx = b.get_index(off).unwrap();
            assert_eq!(b.get_offset(&idx).unwrap(), off);
        }
    }

    #[test]
    fn close_block_sets_hash_and_check_hash_agrees() {
        let mut b = Block::new_tensor(CellType::Integer, [4, 0, 0, 0, 0, 0]);
        b.close_block(HasNaPolicy::Auto, 100);
        assert!(b.check_hash());
        assert_eq!(b.header.created, 100);
    }

    #[test]
    fn byte_tensor_forces_has_na_false_even_if_requested_true() {
        let mut b = Block::new_tensor(CellType::Byte, [4, 0, 0, 0, 0, 0]);
        b.close_block(HasNaPolicy::True, 1);
        assert!(!b.header.has_na);
    }

    #[test]
    fn filter_audit_accepts_matching_length_byte_boolean() {
        let mut b = Block::new_tensor(CellType::ByteBoolean, [4, 0, 0, 0, 0, 0]);
        if let Payload::Tensor(bytes) = &mut b.payload {
            bytes.copy_from_slice(&[1, 0, 1, 0]);
        }
        assert_eq!(b.filter_audit(4), FilterKind::ByteBoolean);
        assert_eq!(b.filter_audit(5), FilterKind::NotAFilter);
    }

    #[test]
    fn filter_audit_rejects_unsorted_integer_filter() {
        let mut b = Block::new_tensor(CellType::Integer, [3, 0, 0, 0, 0, 0]);
        if let Payload::Tensor(bytes) = &mut b.payload {
            bytes[0..4].copy_from_slice(&2i32.to_le_bytes());
            bytes[4..8].copy_from_slice(&1i32.to_le_bytes());
            bytes[8..12].copy_from_slice(&3i32.to_le_bytes());
        }
        assert_eq!(b.filter_audit(10), FilterKind::NotAFilter);
    }
}
