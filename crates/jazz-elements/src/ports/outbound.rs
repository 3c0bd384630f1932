//! # Outbound ports (driven ports)
//!
//! SPEC §4.4–§4.6: the dependencies Persisted, Volatile and Channels
//! require from their host environment. Grounded on the teacher's
//! `ports::outbound` shape (`KeyValueStore`, `TimeSource`,
//! `FileSystemAdapter`), generalized from blockchain storage to Jazz's
//! byte-oriented Container media, plus a `HashProvider` standing in for
//! the teacher's `ChecksumProvider` but using `MurmurHash64A`.

use jazz_types::StatusCode;

/// Abstract key-value storage, the shape Persisted's LMDB adapter and
/// Volatile's RAM adapter both implement underneath the Container trait.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, entity: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StatusCode>;
    fn put(&self, entity: &str, key: &[u8], value: &[u8]) -> Result<(), StatusCode>;
    fn delete(&self, entity: &str, key: &[u8]) -> Result<(), StatusCode>;
    fn exists(&self, entity: &str, key: &[u8]) -> Result<bool, StatusCode>;
    fn create_entity(&self, entity: &str) -> Result<(), StatusCode>;
    fn remove_entity(&self, entity: &str) -> Result<(), StatusCode>;
}

/// Abstract time source, for testability (SPEC §4.1 `close_block` stamps
/// `created`).
pub trait TimeSource: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Abstract filesystem operations, used by Channels' `file` medium.
pub trait FileSystemAdapter: Send + Sync {
    fn read(&self, path: &str) -> Result<Vec<u8>, StatusCode>;
    fn write(&self, path: &str, data: &[u8]) -> Result<(), StatusCode>;
    fn remove_file(&self, path: &str) -> Result<(), StatusCode>;
    fn remove_dir_all(&self, path: &str) -> Result<(), StatusCode>;
    fn create_dir(&self, path: &str) -> Result<(), StatusCode>;
    fn list_dir(&self, path: &str) -> Result<Vec<(String, bool)>, StatusCode>;
    fn metadata_len(&self, path: &str) -> Result<u64, StatusCode>;
    fn exists(&self, path: &str) -> bool;
}

/// Abstract hash computation, standing in for the teacher's
/// `ChecksumProvider` but using the spec's `MurmurHash64A` rather than
/// CRC32C (SPEC §3.2 `hash64`).
pub trait HashProvider: Send + Sync {
    fn hash64(&self, data: &[u8], seed: u64) -> u64;
}

#[derive(Default)]
pub struct MurmurHashProvider;

impl HashProvider for MurmurHashProvider {
    fn hash64(&self, data: &[u8], seed: u64) -> u64 {
        jazz_types::murmur_hash64a(data, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_time_source_is_monotonic_enough_for_a_single_call() {
        let t = SystemTimeSource;
        assert!(t.now() > 0);
    }

    #[test]
    fn murmur_hash_provider_delegates_to_jazz_types() {
        let h = MurmurHashProvider;
        assert_eq!(h.hash64(b"abc", 0), jazz_types::murmur_hash64a(b"abc", 0));
    }
}
