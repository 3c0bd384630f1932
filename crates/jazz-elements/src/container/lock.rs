//! # Container-level spinlock
//!
//! SPEC §4.3 "A separate `lock_container()` / `unlock_container()`
//! (compare-exchange spin, yield every `LOCK_NUM_RETRIES_BEFORE_YIELD`=100
//! attempts) guards pool-level structural changes (free list, allocation
//! counters)." Distinct from the per-Transaction reader/writer lock in
//! `domain::transaction`: this one guards the container's own bookkeeping,
//! never a caller's Block.

use std::sync::atomic::{AtomicBool, Ordering};

/// Spin first, then yield the OS thread every `LOCK_NUM_RETRIES_BEFORE_YIELD`
/// failed compare-exchange attempts, matching the spec's stated backoff.
pub const LOCK_NUM_RETRIES_BEFORE_YIELD: u32 = 100;

#[derive(Debug, Default)]
pub struct ContainerLock {
    locked: AtomicBool,
}

/// RAII guard returned by `ContainerLock::lock`; releases on drop so a
/// panic mid-critical-section cannot leave the pool permanently locked.
pub struct ContainerLockGuard<'a> {
    lock: &'a ContainerLock,
}

impl Drop for ContainerLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

impl ContainerLock {
    pub fn new() -> Self {
        ContainerLock::default()
    }

    pub fn lock(&self) -> ContainerLockGuard<'_> {
        let mut attempts: u32 = 0;
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return ContainerLockGuard { lock: self };
            }
            attempts += 1;
            if attempts % LOCK_NUM_RETRIES_BEFORE_YIELD == 0 {
                std::thread::yield_now();
            } else {
                std::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn guard_releases_lock_on_drop() {
        let lock = ContainerLock::new();
        {
            let _g = lock.lock();
            assert!(lock.locked.load(Ordering::Acquire));
        }
        assert!(!lock.locked.load(Ordering::Acquire));
    }

    #[test]
    fn second_thread_blocks_until_first_releases() {
        let lock = Arc::new(ContainerLock::new());
        let guard = lock.lock();
        let lock2 = Arc::clone(&lock);
        let handle = std::thread::spawn(move || {
            let _g = lock2.lock();
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        drop(guard);
        handle.join().unwrap();
    }
}
