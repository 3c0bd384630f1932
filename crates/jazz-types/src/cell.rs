//! # Cell types and NA sentinels
//!
//! SPEC §3.1. Every Block stores a dense tensor of exactly one `CellType`.
//! Each type either defines a reserved "not available" bit pattern or, for
//! `Byte`, none at all — NA-freedom for `Byte` is a convention enforced by
//! `Block::close_block`, not a type-level guarantee (see SPEC_FULL.md §12.1).

/// NA sentinel shared by `Boolean` and the structural index header fields.
pub const NA_BOOLEAN: u32 = 0xFF;

/// NA sentinel for `ByteBoolean`.
pub const NA_BYTE_BOOLEAN: u8 = 0xFF;

/// Payload bits stashed in the NaN used by [`CellType::Double`]'s NA encoding,
/// matching the original's R-compatible quiet NaN with payload 1954.
pub const NA_DOUBLE_PAYLOAD: u64 = 1954;

/// The cell type tag stored in every Block header.
///
/// Discriminant values are stable: they are written to disk inside Block
/// headers and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CellType {
    /// 1 byte, no NA representation.
    Byte = 0,
    /// 1 byte, NA = 0xFF.
    ByteBoolean = 1,
    /// i32, NA = `i32::MIN`.
    Integer = 2,
    /// i32, same domain as `Integer` but semantically a factor level.
    Factor = 3,
    /// i32, an ordered `Factor`.
    Grade = 4,
    /// u32, NA = 0xFF.
    Boolean = 5,
    /// f32, NA = a quiet NaN.
    Single = 6,
    /// i32 offset into the block's string buffer (0 = NA, 1 = empty).
    String = 7,
    /// i64, NA = `i64::MIN`.
    LongInteger = 8,
    /// i64 epoch seconds, NA = 0.
    Time = 9,
    /// f64, NA = an R-compatible quiet NaN carrying payload 1954.
    Double = 10,
    /// A `tuple-item` `ItemHeader` (40 bytes), structural, non-NA-bearing.
    TupleItem = 11,
    /// A `kind-item` `ItemHeader` (40 bytes), structural, non-NA-bearing.
    KindItem = 12,
    /// Index mapping int keys to int values (48B header, dynamic payload).
    IndexIntToInt = 13,
    /// Index mapping int keys to string values.
    IndexIntToString = 14,
    /// Index mapping string keys to int values.
    IndexStringToInt = 15,
    /// Index mapping string keys to string values.
    IndexStringToString = 16,
}

impl CellType {
    /// Size in bytes of one cell of this type. Structural and index types
    /// report the size of their header record, not a payload cell — callers
    /// that need per-cell tensor arithmetic only call this for the eleven
    /// "real" tensor cell types.
    pub const fn cell_size(self) -> usize {
        match self {
            CellType::Byte | CellType::ByteBoolean => 1,
            CellType::Integer
            | CellType::Factor
            | CellType::Grade
            | CellType::Boolean
            | CellType::Single
            | CellType::String => 4,
            CellType::LongInteger | CellType::Time | CellType::Double => 8,
            CellType::TupleItem | CellType::KindItem => 40,
            CellType::IndexIntToInt
            | CellType::IndexIntToString
            | CellType::IndexStringToInt
            | CellType::IndexStringToString => 48,
        }
    }

    /// Whether this cell type can represent an NA value at all.
    pub const fn has_na_domain(self) -> bool {
        !matches!(self, CellType::Byte)
    }

    /// True for the four structural/index variants that are never stored as
    /// plain dense tensors of scalar cells.
    pub const fn is_dynamic(self) -> bool {
        matches!(
            self,
            CellType::IndexIntToInt
                | CellType::IndexIntToString
                | CellType::IndexStringToInt
                | CellType::IndexStringToString
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_has_no_na_domain() {
        assert!(!CellType::Byte.has_na_domain());
        assert!(CellType::ByteBoolean.has_na_domain());
    }

    #[test]
    fn cell_sizes_match_spec() {
        assert_eq!(CellType::Byte.cell_size(), 1);
        assert_eq!(CellType::Integer.cell_size(), 4);
        assert_eq!(CellType::Double.cell_size(), 8);
        assert_eq!(CellType::TupleItem.cell_size(), 40);
        assert_eq!(CellType::IndexIntToInt.cell_size(), 48);
    }

    #[test]
    fn index_variants_are_dynamic() {
        assert!(CellType::IndexStringToString.is_dynamic());
        assert!(!CellType::Double.is_dynamic());
    }
}
