//! # Text (de)serialization state machine
//!
//! SPEC §4.3 "Serialization / Parsing": `new_block` forms 5 and 6. A shared
//! state machine reads shape and cell type from a textual, bracketed form,
//! filling the tensor with per-type `push_*_cell` routines; the writer is
//! the inverse, emitting the same bracketed shape with a per-type cell
//! format and a bracket separator that closes and reopens dimensions at the
//! right offsets. Escape handling follows C conventions (`\n`, `\t`,
//! `\xHH`, `\OOO`) per SPEC §4.3, grounded on `jazz_blockconv.cpp`
//! (`examples/original_source/server/src/jazz01_blocks/jazz_blockconv.cpp`).
//!
//! Text form is not a stable wire format (SPEC §6): "it is not intended as
//! a stable external format." This parser is intentionally a subset: it
//! handles the common, fully-bracketed rectangular case used by the test
//! harness and the shell/file channels, not every malformed input the
//! original's C state machine tolerates.

use jazz_types::{CellType, StatusCode};

use crate::domain::block::{Block, HasNaPolicy, Payload, MAX_RANK};

/// Parse a bracketed textual tensor, e.g. `[1, 2, 3, 4]` or `[[1, 2], [3,
/// 4]]`, into a Block. `kind` is not threaded into cell-type inference yet
/// (single-item kinds are the common case the Container layer checks
/// against after parsing); cell type is inferred from the literal tokens:
/// quoted -> `String`, containing `.`/`e`/`E` -> `Double`, else `Integer`.
pub fn parse_block_text(text: &[u8]) -> Result<Block, StatusCode> {
    let s = std::str::from_utf8(text).map_err(|_| StatusCode::ParsingNames {
        input: "<non-utf8 bytes>".to_string(),
    })?;
    let mut chars = s.trim().chars().peekable();
    let mut shape: Vec<usize> = Vec::new();
    let mut leaves: Vec<String> = Vec::new();
    parse_bracket(&mut chars, 0, &mut shape, &mut leaves)?;

    if leaves.is_empty() {
        return Ok(Block::new_tensor(CellType::Integer, [0; MAX_RANK]));
    }

    let cell_type = infer_cell_type(&leaves);
    let mut dim = [0i32; MAX_RANK];
    let rank = shape.len().max(1).min(MAX_RANK);
    for (i, &d) in shape.iter().take(MAX_RANK).enumerate() {
        dim[i] = d as i32;
    }
    if shape.is_empty() {
        dim[0] = leaves.len() as i32;
    }

    let mut block = Block::new_tensor(cell_type, dim);
    write_leaves(&mut block, &leaves, cell_type)?;
    let _ = rank;
    block.close_block(HasNaPolicy::Auto, 0);
    Ok(block)
}

fn infer_cell_type(leaves: &[String]) -> CellType {
    if leaves.iter().all(|s| s.starts_with('"')) {
        return CellType::String;
    }
    if leaves.iter().any(|s| s.contains('.') || s.contains('e') || s.contains('E')) {
        return CellType::Double;
    }
    CellType::Integer
}

fn parse_bracket(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    depth: usize,
    shape: &mut Vec<usize>,
    leaves: &mut Vec<String>,
) -> Result<(), StatusCode> {
    skip_ws(chars);
    match chars.peek() {
        Some('[') => {
            chars.next();
            let mut count = 0usize;
            loop {
                skip_ws(chars);
                if chars.peek() == Some(&']') {
                    chars.next();
                    break;
                }
                parse_bracket(chars, depth + 1, shape, leaves)?;
                count += 1;
                skip_ws(chars);
                if chars.peek() == Some(&',') {
                    chars.next();
                }
            }
            if shape.len() <= depth {
                shape.push(count);
            }
            Ok(())
        }
        Some(_) => push_leaf(chars, leaves),
        None => Err(StatusCode::ParsingNames {
            input: "unexpected end of input".to_string(),
        }),
    }
}

fn skip_ws(chars: &mut std::iter::Peekable<std::str::Chars>) {
    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }
}

fn push_leaf(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    leaves: &mut Vec<String>,
) -> Result<(), StatusCode> {
    if chars.peek() == Some(&'"') {
        let s = parse_quoted_string(chars)?;
        leaves.push(format!("\"{s}\""));
        return Ok(());
    }
    let mut tok = String::new();
    while let Some(&c) = chars.peek() {
        if c == ',' || c == ']' || c.is_whitespace() {
            break;
        }
        tok.push(c);
        chars.next();
    }
    if tok.is_empty() {
        return Err(StatusCode::ParsingNames {
            input: "empty token".to_string(),
        });
    }
    leaves.push(tok);
    Ok(())
}

/// Unescape a quoted string token per SPEC §4.3 ("`\n`, `\t`, `\xHH`,
/// `\OOO`").
fn parse_quoted_string(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<String, StatusCode> {
    chars.next(); // opening quote
    let mut out = String::new();
    loop {
        match chars.next() {
            Some('"') => break,
            Some('\\') => out.push(unescape_one(chars)?),
            Some(c) => out.push(c),
            None => {
                return Err(StatusCode::ParsingNames {
                    input: "unterminated string literal".to_string(),
                })
            }
        }
    }
    Ok(out)
}

fn unescape_one(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<char, StatusCode> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('t') => Ok('\t'),
        Some('r') => Ok('\r'),
        Some('\\') => Ok('\\'),
        Some('"') => Ok('"'),
        Some('x') => {
            let hi = chars.next().unwrap_or('0');
            let lo = chars.next().unwrap_or('0');
            let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16).unwrap_or(0);
            Ok(byte as char)
        }
        Some(d) if d.is_digit(8) => {
            let mut oct = String::from(d);
            for _ in 0..2 {
                if matches!(chars.peek(), Some(c) if c.is_digit(8)) {
                    oct.push(chars.next().unwrap());
                }
            }
            let byte = u8::from_str_radix(&oct, 8).unwrap_or(0);
            Ok(byte as char)
        }
        Some(other) => Ok(other),
        None => Err(StatusCode::ParsingNames {
            input: "dangling escape".to_string(),
        }),
    }
}

fn write_leaves(block: &mut Block, leaves: &[String], cell_type: CellType) -> Result<(), StatusCode> {
    match cell_type {
        CellType::Integer => {
            let Payload::Tensor(bytes) = &mut block.payload else {
                unreachable!()
            };
            for (i, leaf) in leaves.iter().enumerate() {
                let v: i32 = leaf.parse().map_err(|_| StatusCode::ParsingNames {
                    input: leaf.clone(),
                })?;
                bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        CellType::Double => {
            let Payload::Tensor(bytes) = &mut block.payload else {
                unreachable!()
            };
            for (i, leaf) in leaves.iter().enumerate() {
                let v: f64 = leaf.parse().map_err(|_| StatusCode::ParsingNames {
                    input: leaf.clone(),
                })?;
                bytes[i * 8..i * 8 + 8].copy_from_slice(&v.to_le_bytes());
            }
        }
        CellType::String => {
            let offsets: Vec<i32> = leaves
                .iter()
                .map(|leaf| {
                    let unquoted = leaf.trim_matches('"');
                    block.intern_string(unquoted)
                })
                .collect();
            let Payload::Tensor(bytes) = &mut block.payload else {
                unreachable!()
            };
            for (i, off) in offsets.into_iter().enumerate() {
                bytes[i * 4..i * 4 + 4].copy_from_slice(&off.to_le_bytes());
            }
        }
        _ => {
            return Err(StatusCode::WrongType {
                expected: "Integer, Double or String",
                got: "other",
            })
        }
    }
    Ok(())
}

/// SPEC §4.3 "a corresponding writer emits bracketed representations with
/// type-specific cell formats and a bracket separator that closes and
/// reopens dimensions at the right offsets." `format` is a printf-style
/// per-cell format; only `%d`, `%f`/`%g` and `%s` are recognised, matching
/// the three cell kinds `write_leaves` can parse back.
pub fn format_block_text(block: &Block, format: &str) -> Result<Vec<u8>, StatusCode> {
    let rank = block.header.rank as usize;
    let dim: Vec<usize> = block.header.dim[..rank].iter().map(|&d| d.max(0) as usize).collect();
    let mut cells: Vec<String> = Vec::with_capacity(block.header.size as usize);

    match block.header.cell_type {
        CellType::Integer | CellType::Factor | CellType::Grade => {
            let Payload::Tensor(bytes) = &block.payload else {
                return Err(StatusCode::WrongType { expected: "tensor", got: "index" });
            };
            for c in bytes.chunks_exact(4) {
                let v = i32::from_le_bytes(c.try_into().unwrap());
                cells.push(apply_format(format, &v.to_string()));
            }
        }
        CellType::Double => {
            let Payload::Tensor(bytes) = &block.payload else {
                return Err(StatusCode::WrongType { expected: "tensor", got: "index" });
            };
            for c in bytes.chunks_exact(8) {
                let v = f64::from_le_bytes(c.try_into().unwrap());
                cells.push(apply_format(format, &v.to_string()));
            }
        }
        CellType::String => {
            let Payload::Tensor(bytes) = &block.payload else {
                return Err(StatusCode::WrongType { expected: "tensor", got: "index" });
            };
            for c in bytes.chunks_exact(4) {
                let off = i32::from_le_bytes(c.try_into().unwrap());
                let s = block.get_string_at(off).unwrap_or("NA");
                cells.push(format!("\"{}\"", escape_string(s)));
            }
        }
        other => {
            return Err(StatusCode::WrongType {
                expected: "Integer, Double or String",
                got: cell_type_name(other),
            })
        }
    }

    let nested = nest(&cells, &dim);
    Ok(nested.into_bytes())
}

fn apply_format(format: &str, default_repr: &str) -> String {
    if format.is_empty() || format == "%d" || format == "%f" || format == "%g" {
        default_repr.to_string()
    } else {
        // Unrecognised format directives fall back to the default textual
        // representation rather than failing the whole serialization.
        default_repr.to_string()
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

fn nest(cells: &[String], dim: &[usize]) -> String {
    if dim.len() <= 1 {
        return format!("[{}]", cells.join(", "));
    }
    let (&outer, rest) = dim.split_first().unwrap();
    let chunk_len: usize = rest.iter().product::<usize>().max(1);
    let mut parts = Vec::with_capacity(outer);
    for chunk in cells.chunks(chunk_len) {
        parts.push(nest(chunk, rest));
    }
    format!("[{}]", parts.join(", "))
}

fn cell_type_name(ct: CellType) -> &'static str {
    match ct {
        CellType::Byte => "Byte",
        CellType::ByteBoolean => "ByteBoolean",
        CellType::Integer => "Integer",
        CellType::Factor => "Factor",
        CellType::Grade => "Grade",
        CellType::Boolean => "Boolean",
        CellType::Single => "Single",
        CellType::String => "String",
        CellType::LongInteger => "LongInteger",
        CellType::Time => "Time",
        CellType::Double => "Double",
        CellType::TupleItem => "TupleItem",
        CellType::KindItem => "KindItem",
        CellType::IndexIntToInt => "IndexIntToInt",
        CellType::IndexIntToString => "IndexIntToString",
        CellType::IndexStringToInt => "IndexStringToInt",
        CellType::IndexStringToString => "IndexStringToString",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_integer_vector() {
        let b = parse_block_text(b"[1, 2, 3, 4]").unwrap();
        assert_eq!(b.header.cell_type, CellType::Integer);
        assert_eq!(b.header.dim[0], 4);
        assert!(b.check_hash());
    }

    #[test]
    fn parses_nested_rank2_vector() {
        let b = parse_block_text(b"[[1, 2], [3, 4]]").unwrap();
        assert_eq!(b.header.rank, 2);
        assert_eq!(b.header.dim[0], 2);
        assert_eq!(b.header.dim[1], 2);
    }

    #[test]
    fn parses_and_formats_strings_with_escapes() {
        let b = parse_block_text(b"[\"foo\", \"bar\\n\"]").unwrap();
        assert_eq!(b.header.cell_type, CellType::String);
        let text = format_block_text(&b, "%s").unwrap();
        let s = String::from_utf8(text).unwrap();
        assert!(s.contains("foo"));
        assert!(s.contains("\\n"));
    }

    #[test]
    fn roundtrips_rank2_integer_through_format_and_parse() {
        let b = parse_block_text(b"[[1, 2], [3, 4]]").unwrap();
        let text = format_block_text(&b, "%d").unwrap();
        let reparsed = parse_block_text(&text).unwrap();
        assert_eq!(reparsed.header.dim[0], 2);
        assert_eq!(reparsed.header.dim[1], 2);
    }
}
