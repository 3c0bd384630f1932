//! # Inbound ports (driving ports)
//!
//! SPEC §4.3 "Container (abstract)". The public CRUD contract every
//! Container descendant (Persisted, Volatile, Channels) implements
//! identically. Per SPEC §9 "Container inheritance": composition plus a
//! trait, not a base class — descendants implement only the native form,
//! the easy form is provided once here via `Locator::parse`.

use jazz_types::{CellType, StatusCode};

use crate::domain::block::Block;
use crate::domain::{Kind, Locator, Transaction};

/// SPEC §4.3 "Write modes combine existence flags ... with payload flags".
/// Packed as bit flags so callers can compose them the way the original
/// does; `payload()` resolves the documented priority
/// `STRING > CONTENT > FULL_BLOCK`, with 0 meaning "base default".
pub mod write_mode {
    pub const ONLY_IF_EXISTS: u8 = 1 << 0;
    pub const ONLY_IF_NOT_EXISTS: u8 = 1 << 1;
    pub const AS_STRING: u8 = 1 << 2;
    pub const AS_CONTENT: u8 = 1 << 3;
    pub const AS_FULL_BLOCK: u8 = 1 << 4;
}

/// Resolved payload mode for a `put`, after applying the documented
/// priority over whatever flag bits were set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    BaseDefault,
    AsString,
    AsContent,
    AsFullBlock,
}

/// A write-mode bitmask, as passed to `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteMode(pub u8);

impl WriteMode {
    pub fn only_if_exists(self) -> bool {
        self.0 & write_mode::ONLY_IF_EXISTS != 0
    }

    pub fn only_if_not_exists(self) -> bool {
        self.0 & write_mode::ONLY_IF_NOT_EXISTS != 0
    }

    /// `STRING > CONTENT > FULL_BLOCK` priority when more than one payload
    /// flag is set (SPEC §4.3).
    pub fn payload(self) -> PayloadMode {
        if self.0 & write_mode::AS_STRING != 0 {
            PayloadMode::AsString
        } else if self.0 & write_mode::AS_CONTENT != 0 {
            PayloadMode::AsContent
        } else if self.0 & write_mode::AS_FULL_BLOCK != 0 {
            PayloadMode::AsFullBlock
        } else {
            PayloadMode::BaseDefault
        }
    }
}

/// Row-filter or item-name selector for the `get` overloads (SPEC §4.3
/// "easy: `get(p_txn, path)`, `get(p_txn, path, row_filter)`, `get(p_txn,
/// path, item_name)`").
pub enum GetSelector<'a> {
    Whole,
    RowFilter(&'a Block),
    ItemName(&'a str),
}

/// The full CRUD contract, implemented natively (against a parsed
/// `Locator`) by every Container descendant. The easy (string-path) form is
/// provided once via a default method that calls `Locator::parse` and
/// dispatches to the native form — descendants only implement the
/// `*_native` methods (SPEC §9 "Container inheritance").
pub trait Container: Send + Sync {
    /// SPEC §4.3 allocation form: a zero-filled tensor of `cell_type`/`dim`.
    fn new_block_tensor(&self, cell_type: CellType, dim: [i32; 6]) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form: assemble a Kind.
    fn new_block_kind(&self, kind: Kind) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form 3: a tensor filtered by a row-filter Block.
    fn new_block_filtered(&self, source: &Block, filter: &Block) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form 4: a tensor extracted from a Tuple by item name.
    fn new_block_from_item(&self, tuple_txn: &Transaction, item_name: &str) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form 5: parsed from a byte-tensor text
    /// representation, optionally checked against a provided Kind.
    fn new_block_parsed(&self, text: &[u8], kind: Option<&Kind>) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form 6: serialised to a byte-tensor (or string
    /// Block) using a printf-style cell format.
    fn new_block_serialized(&self, source: &Block, format: &str) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form 7: an empty Index of one of the four flavours.
    fn new_block_index(&self, cell_type: CellType) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 allocation form 8: a `(key:STRING, value:STRING)` Tuple
    /// materialised from an Index.
    fn new_block_tuple_from_index(&self, index_txn: &Transaction) -> Result<Transaction, StatusCode>;

    /// SPEC §4.3 transaction pool: take from the free list or `NO_MEM`.
    fn new_transaction(&self) -> Result<Transaction, StatusCode>;

    /// Must be routed to the *owning* container (SPEC §3.4) — a blanket
    /// default would silently drop medium-specific teardown (e.g. aborting
    /// an LMDB read txn), so every descendant implements this itself.
    fn destroy_transaction(&self, txn: Transaction) -> Result<(), StatusCode>;

    fn get_native(&self, locator: &Locator, selector: GetSelector) -> Result<Transaction, StatusCode>;

    fn header_native(&self, locator: &Locator) -> Result<Transaction, StatusCode>;

    fn put_native(&self, locator: &Locator, block: Block, mode: WriteMode) -> Result<(), StatusCode>;

    fn remove_native(&self, locator: &Locator) -> Result<(), StatusCode>;

    fn new_entity_native(&self, locator: &Locator) -> Result<(), StatusCode>;

    /// Cross-medium copy: default implementation reduces to `get` on
    /// `src` then `put` on `dst` (SPEC §2 "Containers may delegate
    /// cross-medium `copy` via internal `get` then `put`").
    fn copy_native(&self, dst: &Locator, src: &Locator) -> Result<(), StatusCode> {
        let txn = self.get_native(src, GetSelector::Whole)?;
        let Some(block) = txn.block else {
            return Err(StatusCode::BlockNotFound);
        };
        self.put_native(dst, block, WriteMode::default())
    }

    /// SPEC §4.3 "Code execution hooks": a stub here, implemented by higher
    /// layers that plug compiled snippets. Arguments are always wrapped
    /// copy-on-write so a mutator never mutates its caller's block.
    fn exec(&self, _locator: &Locator, _args: &Block) -> Result<Transaction, StatusCode> {
        Err(StatusCode::NotImplemented)
    }

    fn modify(&self, _locator: &Locator, _args: &Block) -> Result<(), StatusCode> {
        Err(StatusCode::NotImplemented)
    }

    // -- Easy (string-path) interface: parse then dispatch to native. --

    fn get(&self, path: &str, selector: GetSelector) -> Result<Transaction, StatusCode> {
        self.get_native(&Locator::parse(path)?, selector)
    }

    fn header(&self, path: &str) -> Result<Transaction, StatusCode> {
        self.header_native(&Locator::parse(path)?)
    }

    fn put(&self, path: &str, block: Block, mode: WriteMode) -> Result<(), StatusCode> {
        self.put_native(&Locator::parse(path)?, block, mode)
    }

    fn remove(&self, path: &str) -> Result<(), StatusCode> {
        self.remove_native(&Locator::parse(path)?)
    }

    fn new_entity(&self, path: &str) -> Result<(), StatusCode> {
        self.new_entity_native(&Locator::parse(path)?)
    }

    fn copy(&self, dst: &str, src: &str) -> Result<(), StatusCode> {
        self.copy_native(&Locator::parse(dst)?, &Locator::parse(src)?)
    }
}
