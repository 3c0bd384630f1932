//! # Block header
//!
//! SPEC §3.2 item 1. Fixed-size metadata that prefixes every Block's tensor.

use jazz_types::CellType;

/// Maximum tensor rank a Block may declare.
pub const MAX_RANK: usize = 6;

/// Fixed-size header stored at the front of every Block allocation.
///
/// Field order matches the spec's layout so `total_bytes - size_of::<BlockHeader>()`
/// is exactly the byte extent hashed by `hash64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockHeader {
    pub cell_type: CellType,
    /// Total cell count across all dimensions (`dim[0] * dim[1] * ... `).
    pub size: i64,
    /// Creation timestamp, epoch seconds. Stamped once by `close_block`.
    pub created: i64,
    /// Number of significant dimensions, 1..=6. Trailing `dim[rank..]` are 0.
    pub rank: u8,
    pub dim: [i32; MAX_RANK],
    pub num_attributes: i32,
    /// Total allocation size in bytes: header + tensor + attribute table + string buffer.
    pub total_bytes: i64,
    pub has_na: bool,
    pub hash64: u64,
}

impl BlockHeader {
    /// A zeroed header for `cell_type`, rank 1, size 0 — the degenerate
    /// "all dims zero" case from `set_dimensions`.
    pub fn empty(cell_type: CellType) -> Self {
        BlockHeader {
            cell_type,
            size: 0,
            created: 0,
            rank: 1,
            dim: [0; MAX_RANK],
            num_attributes: 0,
            total_bytes: 0,
            has_na: false,
            hash64: 0,
        }
    }

    /// Byte extent of the tensor alone.
    pub fn tensor_bytes(&self) -> usize {
        self.size as usize * self.cell_type.cell_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_header_has_rank_one_and_zero_size() {
        let h = BlockHeader::empty(CellType::Integer);
        assert_eq!(h.rank, 1);
        assert_eq!(h.size, 0);
        assert_eq!(h.tensor_bytes(), 0);
    }
}
