//! # Attribute table
//!
//! SPEC §3.2 item 3, §9 "Attributes and dimension names": a map of `i32` key
//! to a string-buffer offset. Attributes are set exactly once, at
//! construction; `set_attributes` after that is a silent no-op (SPEC §4.1).

use std::collections::BTreeMap;

use super::strings::StringBuffer;

/// `key -> string-buffer offset`. Kept sorted (`BTreeMap`) so the serialized
/// attribute table has a deterministic byte order, which keeps `hash64`
/// reproducible for logically-identical blocks.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    entries: BTreeMap<i32, i32>,
    sealed: bool,
}

impl AttributeTable {
    pub fn new() -> Self {
        AttributeTable::default()
    }

    /// Set all attributes at once, interning each value into `strings`.
    /// No-op (not an error) if attributes were already set — SPEC §4.1:
    /// "only callable once, at construction; silently no-ops afterward".
    pub fn set_all(&mut self, attrs: &[(i32, &str)], strings: &mut StringBuffer) {
        if self.sealed {
            return;
        }
        for (key, val) in attrs {
            let offset = strings.intern(val);
            self.entries.insert(*key, offset);
        }
        self.sealed = true;
    }

    /// Install already-resolved `(key, offset)` pairs directly, bypassing
    /// interning. Used when reconstructing a Block from its wire image,
    /// where the offsets already point into the string buffer being
    /// restored alongside them.
    pub fn install_raw(&mut self, pairs: Vec<(i32, i32)>) {
        self.entries = pairs.into_iter().collect();
        self.sealed = true;
    }

    pub fn get(&self, key: i32) -> Option<i32> {
        self.entries.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_set_all_is_a_no_op() {
        let mut strings = StringBuffer::new(1024);
        let mut attrs = AttributeTable::new();
        attrs.set_all(&[(1, "a")], &mut strings);
        attrs.set_all(&[(2, "b")], &mut strings);
        assert_eq!(attrs.len(), 1);
        assert!(attrs.get(2).is_none());
    }

    #[test]
    fn resolves_values_through_the_string_buffer() {
        let mut strings = StringBuffer::new(1024);
        let mut attrs = AttributeTable::new();
        attrs.set_all(&[(7, "hello")], &mut strings);
        let off = attrs.get(7).unwrap();
        assert_eq!(strings.get(off), Some("hello"));
    }
}
