//! # Transaction pool and allocation accounting
//!
//! SPEC §4.3 "Transaction pool" and "Allocation accounting". The original
//! keeps a literal fixed-size free list of `Transaction` structs recycled by
//! pointer; in Rust, each `Transaction` owns its `Block` outright (SPEC §9
//! "model this as an owned handle"), so there is nothing to recycle by
//! identity — what the free list actually bounds is *how many Transactions
//! may be outstanding at once* and *how many bytes they collectively hold*.
//! `TransactionPool` models exactly that: a counting admission control in
//! front of `Transaction::empty`, backed by the same [`ContainerLock`]
//! spinlock the spec assigns to "pool-level structural changes".

use std::sync::atomic::{AtomicU64, Ordering};

use jazz_types::StatusCode;

use super::lock::ContainerLock;
use crate::domain::Transaction;

/// SPEC §4.3 "every malloc routed through a wrapper that fails-fast above
/// `fail_alloc_bytes` and logs once at `warn_alloc_bytes`". Guarded by
/// `ContainerLock` rather than its own mutex since it is structural
/// pool-level bookkeeping, same as the free list itself.
pub struct AllocAccounting {
    lock: ContainerLock,
    in_use_bytes: AtomicU64,
    warn_bytes: u64,
    fail_bytes: u64,
    warned: std::sync::atomic::AtomicBool,
}

impl AllocAccounting {
    pub fn new(warn_bytes: u64, fail_bytes: u64) -> Self {
        AllocAccounting {
            lock: ContainerLock::new(),
            in_use_bytes: AtomicU64::new(0),
            warn_bytes,
            fail_bytes,
            warned: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Reserve `bytes` against the budget. Fails with `NoMem` above
    /// `fail_bytes`; logs once (not on every call) the first time the
    /// running total crosses `warn_bytes`.
    pub fn reserve(&self, bytes: u64) -> Result<(), StatusCode> {
        let _guard = self.lock.lock();
        let next = self.in_use_bytes.load(Ordering::Acquire) + bytes;
        if next > self.fail_bytes {
            return Err(StatusCode::NoMem {
                requested: bytes as usize,
                budget: self.fail_bytes as usize,
            });
        }
        if next > self.warn_bytes && !self.warned.swap(true, Ordering::AcqRel) {
            tracing::warn!(in_use_bytes = next, warn_bytes = self.warn_bytes, "allocation accounting crossed warn threshold");
        }
        self.in_use_bytes.store(next, Ordering::Release);
        Ok(())
    }

    /// Release `bytes` previously reserved. SPEC §4.3 "Per-block allocations
    /// clear `cell_type` and `total_bytes` so `destroy_transaction` can
    /// subtract the right amount" — callers pass the exact byte count they
    /// reserved, read from the block before it is dropped.
    pub fn release(&self, bytes: u64) {
        let _guard = self.lock.lock();
        let cur = self.in_use_bytes.load(Ordering::Acquire);
        self.in_use_bytes.store(cur.saturating_sub(bytes), Ordering::Release);
    }

    pub fn in_use_bytes(&self) -> u64 {
        self.in_use_bytes.load(Ordering::Acquire)
    }
}

/// Admission control standing in for the original's fixed free list (SPEC
/// §4.3, §8 property 9 "after N paired new/destroy cycles, `alloc_bytes`
/// returns to its pre-cycle value exactly").
pub struct TransactionPool {
    lock: ContainerLock,
    max_transactions: u32,
    outstanding: AtomicU64,
    owner_name: String,
}

impl TransactionPool {
    pub fn new(max_transactions: u32, owner_name: impl Into<String>) -> Self {
        TransactionPool {
            lock: ContainerLock::new(),
            max_transactions,
            outstanding: AtomicU64::new(0),
            owner_name: owner_name.into(),
        }
    }

    /// SPEC §4.3 `new_transaction`: "takes from the free list or returns
    /// `OUT_OF_MEM`".
    pub fn acquire(&self) -> Result<Transaction, StatusCode> {
        let _guard = self.lock.lock();
        let cur = self.outstanding.load(Ordering::Acquire);
        if cur >= self.max_transactions as u64 {
            return Err(StatusCode::NoMem {
                requested: 1,
                budget: self.max_transactions as usize,
            });
        }
        self.outstanding.store(cur + 1, Ordering::Release);
        Ok(Transaction::empty(self.owner_name.clone()))
    }

    /// SPEC §4.3 `destroy_transaction`: "returns the Transaction after
    /// freeing its block". The caller (the owning Container) has already
    /// performed any medium-specific teardown; this just returns the slot.
    pub fn release(&self, mut txn: Transaction) {
        txn.destroy();
        let _guard = self.lock.lock();
        let cur = self.outstanding.load(Ordering::Acquire);
        self.outstanding.store(cur.saturating_sub(1), Ordering::Release);
    }

    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_accounting_fails_above_budget() {
        let acc = AllocAccounting::new(100, 200);
        acc.reserve(150).unwrap();
        assert!(acc.reserve(100).is_err());
    }

    #[test]
    fn alloc_accounting_round_trips_to_zero() {
        let acc = AllocAccounting::new(1000, 2000);
        for _ in 0..10 {
            acc.reserve(64).unwrap();
            acc.release(64);
        }
        assert_eq!(acc.in_use_bytes(), 0);
    }

    #[test]
    fn pool_enforces_max_outstanding() {
        let pool = TransactionPool::new(2, "test");
        let t1 = pool.acquire().unwrap();
        let t2 = pool.acquire().unwrap();
        assert!(pool.acquire().is_err());
        pool.release(t1);
        let t3 = pool.acquire().unwrap();
        pool.release(t2);
        pool.release(t3);
        assert_eq!(pool.outstanding(), 0);
    }
}
