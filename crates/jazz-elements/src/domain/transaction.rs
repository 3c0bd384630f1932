//! # Transaction
//!
//! SPEC §3.4, §9 "Reader/writer lock": a container-owned handle to a Block
//! with a reader/writer lock and a status. Per the spec's own Design Notes,
//! the lock is implemented as two explicit atomic counters (readers,
//! writer-intent) rather than the original's single counter with the
//! ±46341-overflow trick — the contract is the same (cheap reader/writer
//! discipline without OS primitives) but made explicit instead of relying
//! on a chosen overflow threshold.

use std::sync::atomic::{AtomicU32, Ordering};

use jazz_types::StatusCode;

use crate::domain::block::Block;
use crate::domain::tuple::Tuple;

/// Lifecycle status of a Transaction slot (SPEC §3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Allocated from the pool, no block attached yet.
    Empty,
    /// A block is attached and readable/writable per the lock state.
    Ready,
    /// Returned to the free list; must not be touched again.
    Destroyed,
}

/// Two independent atomic counters standing in for the original's single
/// overflow-based lock word (SPEC §9). `readers` counts concurrent shared
/// holders; `writer_intent` is 0 or 1 — at most one writer may hold a
/// Transaction at a time, and a writer excludes all readers.
#[derive(Debug, Default)]
pub struct RwLockState {
    readers: AtomicU32,
    writer_intent: AtomicU32,
}

impl RwLockState {
    pub fn new() -> Self {
        RwLockState::default()
    }

    /// SPEC §4.3 `enter_read`. Fails if a writer currently holds the lock.
    pub fn enter_read(&self) -> Result<(), StatusCode> {
        if self.writer_intent.load(Ordering::Acquire) != 0 {
            return Err(StatusCode::ReadForbidden);
        }
        self.readers.fetch_add(1, Ordering::AcqRel);
        // Re-check: a writer may have raced in between the two loads above.
        if self.writer_intent.load(Ordering::Acquire) != 0 {
            self.readers.fetch_sub(1, Ordering::AcqRel);
            return Err(StatusCode::ReadForbidden);
        }
        Ok(())
    }

    pub fn leave_read(&self) {
        self.readers.fetch_sub(1, Ordering::AcqRel);
    }

    /// SPEC §4.3 `enter_write`. Fails if a writer already holds the lock or
    /// any readers are active.
    pub fn enter_write(&self) -> Result<(), StatusCode> {
        if self
            .writer_intent
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StatusCode::WriteForbidden {
                reason: "another writer holds this transaction".into(),
            });
        }
        if self.readers.load(Ordering::Acquire) != 0 {
            self.writer_intent.store(0, Ordering::Release);
            return Err(StatusCode::WriteForbidden {
                reason: "readers are active".into(),
            });
        }
        Ok(())
    }

    pub fn leave_write(&self) {
        self.writer_intent.store(0, Ordering::Release);
    }

    pub fn reader_count(&self) -> u32 {
        self.readers.load(Ordering::Acquire)
    }

    pub fn has_writer(&self) -> bool {
        self.writer_intent.load(Ordering::Acquire) != 0
    }
}

/// A container-owned handle to a Block (SPEC §3.4). `owner` identifies the
/// container that allocated this slot so `destroy_transaction` can be
/// routed back to it — load-bearing for Persisted, whose Ready state holds
/// an open LMDB read transaction that must be aborted on release.
pub struct Transaction {
    pub block: Option<Block>,
    /// Present only when this Transaction was materialised from a Kind/Index
    /// as a Tuple (`new_block_tuple_from_index`, `new_block_kind`'s instance
    /// form) — the item-name -> Block lookup `new_block_from_item` needs
    /// isn't expressible as a flat tensor, so Tuples carry their own value
    /// alongside the Block view of their contents.
    pub tuple: Option<Tuple>,
    pub lock: RwLockState,
    pub status: TransactionStatus,
    pub owner: String,
}

impl Transaction {
    pub fn empty(owner: impl Into<String>) -> Self {
        Transaction {
            block: None,
            tuple: None,
            lock: RwLockState::new(),
            status: TransactionStatus::Empty,
            owner: owner.into(),
        }
    }

    pub fn attach(&mut self, block: Block) {
        self.block = Some(block);
        self.status = TransactionStatus::Ready;
    }

    /// Attach both the Tuple value and a Block view of it (e.g. its first
    /// item, or a header block) so item lookups and whole-block reads both
    /// work against the same Transaction.
    pub fn attach_tuple(&mut self, tuple: Tuple, block: Block) {
        self.tuple = Some(tuple);
        self.block = Some(block);
        self.status = TransactionStatus::Ready;
    }

    /// Release the block and mark this slot ready for reuse. The owning
    /// container is responsible for any medium-specific teardown (aborting
    /// an LMDB read txn, etc.) before calling this.
    pub fn destroy(&mut self) {
        self.block = None;
        self.tuple = None;
        self.status = TransactionStatus::Destroyed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_can_share_while_no_writer() {
        let lock = RwLockState::new();
        lock.enter_read().unwrap();
        lock.enter_read().unwrap();
        assert_eq!(lock.reader_count(), 2);
        lock.leave_read();
        lock.leave_read();
        assert_eq!(lock.reader_count(), 0);
    }

    #[test]
    fn writer_excludes_readers_and_other_writers() {
        let lock = RwLockState::new();
        lock.enter_write().unwrap();
        assert!(lock.enter_read().is_err());
        assert!(lock.enter_write().is_err());
        lock.leave_write();
        assert!(lock.enter_read().is_ok());
    }

    #[test]
    fn writer_blocked_while_readers_active() {
        let lock = RwLockState::new();
        lock.enter_read().unwrap();
        assert!(lock.enter_write().is_err());
        lock.leave_read();
        assert!(lock.enter_write().is_ok());
    }
}
