//! # Status codes
//!
//! SPEC §7. Every Container method returns `Result<T, StatusCode>`. Positive
//! discriminants are reserved for the text parser's own sub-states (SPEC §7);
//! all error kinds here are negative so the two ranges never collide on the
//! wire.

use thiserror::Error;

/// A signed status code returned by Container operations.
///
/// Grounded on the teacher's `StorageError` (`thiserror`-derived, one variant
/// per invariant violation) generalized to the full kind table in SPEC §7.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusCode {
    #[error("not implemented")]
    NotImplemented,

    #[error("bad configuration: {key}")]
    BadConfig { key: String },

    #[error("service failed to start: {reason}")]
    Starting { reason: String },

    #[error("out of memory: requested {requested} bytes, budget {budget} bytes")]
    NoMem { requested: usize, budget: usize },

    #[error("invalid new_block arguments: {reason}")]
    NewBlockArgs { reason: String },

    #[error("wrong type: expected {expected:?}, got {got:?}")]
    WrongType {
        expected: &'static str,
        got: &'static str,
    },

    #[error("wrong name: {name}")]
    WrongName { name: String },

    #[error("wrong arguments: {reason}")]
    WrongArguments { reason: String },

    #[error("block failed audit: {reason}")]
    BadBlock { reason: String },

    #[error("write forbidden: {reason}")]
    WriteForbidden { reason: String },

    #[error("write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("remove failed: {reason}")]
    RemoveFailed { reason: String },

    #[error("create failed: {reason}")]
    CreateFailed { reason: String },

    #[error("block not found")]
    BlockNotFound,

    #[error("could not parse locator: {input}")]
    ParsingNames { input: String },

    #[error("read forbidden")]
    ReadForbidden,

    #[error("server error: {reason}")]
    MiscServer { reason: String },

    #[error("base disabled by configuration")]
    BaseForbidden,

    #[error("operation not applicable to this container")]
    NotApplicable,
}

impl StatusCode {
    /// True for "the thing you asked for legitimately is not there", as
    /// opposed to misuse or infrastructure failure — callers use this to
    /// decide whether to retry against another medium.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StatusCode::BlockNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(StatusCode::BlockNotFound.is_not_found());
        assert!(!StatusCode::BadConfig { key: "x".into() }.is_not_found());
    }

    #[test]
    fn display_is_human_readable() {
        let e = StatusCode::WrongName {
            name: "1bad".into(),
        };
        assert!(format!("{e}").contains("1bad"));
    }
}
