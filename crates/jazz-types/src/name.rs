//! # Name identifier discipline
//!
//! SPEC §3.3. `base`, `entity` and attribute names all obey the same grammar:
//! `^[A-Za-z][A-Za-z0-9_\-~$]{0,30}$`, capped at `SHORT_NAME` length.

use std::fmt;

/// Maximum length of a `Name`, including the leading character.
pub const SHORT_NAME: usize = 31;

/// A validated Jazz identifier (base, entity or attribute name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

/// Why a candidate string failed to become a [`Name`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name exceeds {SHORT_NAME} characters")]
    TooLong,
    #[error("name must start with a letter")]
    BadFirstChar,
    #[error("name contains a character outside [A-Za-z0-9_-~$]")]
    BadChar,
}

impl Name {
    /// Validate and wrap `s` as a `Name`.
    pub fn new(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        if s.len() > SHORT_NAME {
            return Err(NameError::TooLong);
        }
        let mut chars = s.chars();
        let first = chars.next().expect("checked non-empty above");
        if !first.is_ascii_alphabetic() {
            return Err(NameError::BadFirstChar);
        }
        if !chars.all(is_name_char) {
            return Err(NameError::BadChar);
        }
        Ok(Name(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '~' | '$')
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Name {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(Name::new("lmdb").is_ok());
        assert!(Name::new("e_1-2~3$").is_ok());
    }

    #[test]
    fn rejects_leading_digit() {
        assert_eq!(Name::new("1abc"), Err(NameError::BadFirstChar));
    }

    #[test]
    fn rejects_too_long() {
        let s = "a".repeat(40);
        assert_eq!(Name::new(s), Err(NameError::TooLong));
    }

    #[test]
    fn rejects_bad_char() {
        assert_eq!(Name::new("a b"), Err(NameError::BadChar));
    }
}
