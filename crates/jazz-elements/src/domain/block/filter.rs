//! # Filter application
//!
//! SPEC §4.3 `new_block` form 3 and §8 property 4: select rows from a
//! tensor Block using a byte-boolean or sorted-integer filter Block, along
//! axis 0. SPEC_FULL.md §12.2 resolves the empty-filter Open Question: an
//! empty filter (zero-length byte-boolean or zero-length integer index)
//! always selects zero rows, never "all rows".

use jazz_types::StatusCode;

use super::block::{Block, FilterKind, HasNaPolicy, Payload};
use super::header::MAX_RANK;

/// Apply `filter` to `source` along axis 0, returning a new tensor Block
/// containing only the selected rows. `source` must have `rank >= 1`; the
/// filter's audited row count is checked against `source.header.dim[0]`.
pub fn apply_filter(source: &Block, filter: &Block) -> Result<Block, StatusCode> {
    let rows = source.header.dim[0] as i64;
    match filter.filter_audit(rows) {
        FilterKind::NotAFilter => Err(StatusCode::WrongArguments {
            reason: "block is not a valid row filter".into(),
        }),
        FilterKind::ByteBoolean => apply_byte_boolean(source, filter, rows),
        FilterKind::Integer => apply_integer(source, filter, rows),
    }
}

fn selected_row_indices_from_bool(filter: &Block) -> Vec<i64> {
    let Payload::Tensor(bytes) = &filter.payload else {
        return Vec::new();
    };
    bytes
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b != 0 && b != jazz_types::NA_BYTE_BOOLEAN)
        .map(|(i, _)| i as i64)
        .collect()
}

fn selected_row_indices_from_int(filter: &Block) -> Vec<i64> {
    let Payload::Tensor(bytes) = &filter.payload else {
        return Vec::new();
    };
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()) as i64)
        .collect()
}

fn apply_byte_boolean(source: &Block, filter: &Block, _rows: i64) -> Result<Block, StatusCode> {
    let selected = selected_row_indices_from_bool(filter);
    gather_rows(source, &selected)
}

fn apply_integer(source: &Block, filter: &Block, _rows: i64) -> Result<Block, StatusCode> {
    let selected = selected_row_indices_from_int(filter);
    gather_rows(source, &selected)
}

fn gather_rows(source: &Block, selected: &[i64]) -> Result<Block, StatusCode> {
    let Payload::Tensor(bytes) = &source.payload else {
        return Err(StatusCode::WrongType {
            expected: "tensor",
            got: "index",
        });
    };

    let cell_size = source.header.cell_type.cell_size();
    let row_stride: usize = source.header.dim[1..source.header.rank as usize]
        .iter()
        .map(|&d| d.max(1) as usize)
        .product::<usize>()
        * cell_size;

    let mut out_bytes = Vec::with_capacity(selected.len() * row_stride);
    for &row in selected {
        let start = row as usize * row_stride;
        let end = start + row_stride;
        out_bytes.extend_from_slice(&bytes[start..end]);
    }

    let mut dim = source.header.dim;
    dim[0] = selected.len() as i32;
    let mut result = Block::new_tensor(source.header.cell_type, dim);
    if let Payload::Tensor(dst) = &mut result.payload {
        *dst = out_bytes;
    }
    result.close_block(HasNaPolicy::Auto, source.header.created);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jazz_types::CellType;

    fn rank2_i32(rows: i32, cols: i32, values: &[i32]) -> Block {
        let mut dim = [0i32; MAX_RANK];
        dim[0] = rows;
        dim[1] = cols;
        let mut b = Block::new_tensor(CellType::Integer, dim);
        if let Payload::Tensor(bytes) = &mut b.payload {
            for (i, v) in values.iter().enumerate() {
                bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        b.close_block(HasNaPolicy::Auto, 0);
        b
    }

    #[test]
    fn filters_rank2_tensor_by_boolean_mask() {
        let source = rank2_i32(4, 2, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut dim = [0i32; MAX_RANK];
        dim[0] = 4;
        let mut filter = Block::new_tensor(CellType::ByteBoolean, dim);
        if let Payload::Tensor(bytes) = &mut filter.payload {
            bytes.copy_from_slice(&[1, 0, 1, 0]);
        }
        filter.close_block(HasNaPolicy::Auto, 0);

        let result = apply_filter(&source, &filter).unwrap();
        assert_eq!(result.header.dim[0], 2);
        assert_eq!(result.header.dim[1], 2);
        let Payload::Tensor(bytes) = &result.payload else {
            panic!("expected tensor")
        };
        let values: Vec<i32> = bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values, vec![1, 2, 5, 6]);
        assert!(result.check_hash());
    }

    #[test]
    fn empty_filter_selects_zero_rows() {
        let source = rank2_i32(4, 2, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let filter = Block::new_index(super::super::block::IndexMap::IntToInt(Default::default()));
        // An Index is not a valid filter; construct a genuinely empty
        // integer filter instead, matching "empty filter -> empty result".
        let empty_filter = {
            let mut dim = [0i32; MAX_RANK];
            dim[0] = 0;
            let mut f = Block::new_tensor(CellType::Integer, dim);
            f.close_block(HasNaPolicy::Auto, 0);
            f
        };
        let _ = filter; // not used as a filter; constructed only to show the contrast
        let result = apply_filter(&source, &empty_filter).unwrap();
        assert_eq!(result.header.dim[0], 0);
    }
}
