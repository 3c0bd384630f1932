//! # Persisted: the LMDB-backed Container
//!
//! SPEC §4.4. Same CRUD contract as Volatile, backed by `heed3` (a safe
//! Rust LMDB binding) instead of a `HashMap`. Each entity is a named LMDB
//! database inside one shared environment; unlike Volatile, reads verify
//! the stored Block's hash and refuse a corrupted value rather than
//! silently returning it (SPEC §4.4 "every read recomputes the hash").
//!
//! Grounded on `heed3`'s `Env`/`Database`/`RoTxn`/`RwTxn` surface as used by
//! a real LMDB-backed storage backend in the reference pack — environment
//! opened once at startup with explicit flags, one `Database<Bytes, Bytes>`
//! handle per named entity, one short-lived read or write transaction per
//! operation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use heed3::types::Bytes;
use heed3::{Database, Env, EnvOpenOptions, WithoutTls};
use jazz_types::{CellType, StatusCode};

use crate::container::{
    filtered_block, index_block, item_block, kind_block, parsed_block, serialized_block,
    tensor_block, tuple_from_index, unwrap_received, AllocAccounting, TransactionPool,
};
use crate::domain::block::Block;
use crate::domain::config::LmdbConfig;
use crate::domain::{Kind, Locator, Transaction};
use crate::ports::inbound::{Container, GetSelector, WriteMode};
use crate::ports::outbound::{KeyValueStore, SystemTimeSource, TimeSource};

/// Entities created eagerly at startup regardless of what callers ask for
/// later (SPEC §4.4 "reserved entities exist before the first request").
pub const RESERVED_ENTITIES: &[&str] =
    &["sys", "group", "kind", "field", "flux", "agent", "static"];

fn lmdb_error(reason: impl Into<String>) -> StatusCode {
    StatusCode::MiscServer { reason: reason.into() }
}

/// A single LMDB environment with one named database per entity.
pub struct Persisted {
    name: String,
    env: Env<WithoutTls>,
    dbs: RwLock<HashMap<String, Database<Bytes, Bytes>>>,
    pool: TransactionPool,
    alloc: AllocAccounting,
    clock: Arc<dyn TimeSource>,
}

impl Persisted {
    pub fn open(
        name: impl Into<String>,
        config: &LmdbConfig,
        max_transactions: u32,
        warn_bytes: u64,
        fail_bytes: u64,
    ) -> Result<Self, StatusCode> {
        let name = name.into();
        std::fs::create_dir_all(&config.persistence_path).map_err(|e| {
            StatusCode::Starting {
                reason: format!("creating LMDB directory {}: {e}", config.persistence_path),
            }
        })?;

        let mut opts = EnvOpenOptions::new().read_txn_without_tls();
        opts.map_size(config.map_size_mb as usize * 1024 * 1024);
        opts.max_dbs(config.max_dbs);
        opts.max_readers(config.max_readers);

        let mut flags = heed3::EnvFlags::empty();
        if config.fixed_map {
            flags |= heed3::EnvFlags::FIXED_MAP;
        }
        if config.write_map {
            flags |= heed3::EnvFlags::WRITE_MAP;
        }
        if config.no_meta_sync {
            flags |= heed3::EnvFlags::NO_META_SYNC;
        }
        if config.no_sync {
            flags |= heed3::EnvFlags::NO_SYNC;
        }
        if config.map_async {
            flags |= heed3::EnvFlags::MAP_ASYNC;
        }
        if config.no_lock {
            flags |= heed3::EnvFlags::NO_LOCK;
        }
        if config.no_rd_ahead {
            flags |= heed3::EnvFlags::NO_READ_AHEAD;
        }
        if config.no_mem_init {
            flags |= heed3::EnvFlags::NO_MEM_INIT;
        }
        unsafe {
            opts.flags(flags);
        }

        let env = unsafe { opts.open(Path::new(&config.persistence_path)) }
            .map_err(|e| StatusCode::Starting { reason: format!("opening LMDB environment: {e}") })?;

        let persisted = Persisted {
            name,
            env,
            dbs: RwLock::new(HashMap::new()),
            pool: TransactionPool::new(max_transactions, "persisted"),
            alloc: AllocAccounting::new(warn_bytes, fail_bytes),
            clock: Arc::new(SystemTimeSource),
        };

        for entity in RESERVED_ENTITIES {
            persisted.create_entity(entity)?;
        }
        Ok(persisted)
    }

    fn reserve_and_acquire(&self, block: Block) -> Result<Transaction, StatusCode> {
        self.alloc.reserve(block.header.total_bytes as u64)?;
        let mut txn = self.pool.acquire()?;
        txn.attach(block);
        Ok(txn)
    }

    fn require_entity_and_key<'a>(locator: &'a Locator) -> Result<(&'a str, &'a str), StatusCode> {
        let entity = locator.entity.as_ref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "Persisted requires a locator with an entity".into(),
        })?;
        let key = locator.key.as_deref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "Persisted requires a locator with a key".into(),
        })?;
        Ok((entity.as_str(), key))
    }

    fn database(&self, entity: &str) -> Result<Database<Bytes, Bytes>, StatusCode> {
        self.dbs
            .read()
            .unwrap()
            .get(entity)
            .cloned()
            .ok_or_else(|| StatusCode::WrongName { name: entity.to_string() })
    }
}

impl KeyValueStore for Persisted {
    fn get(&self, entity: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StatusCode> {
        let db = self.database(entity)?;
        let rtxn = self.env.read_txn().map_err(|e| lmdb_error(e.to_string()))?;
        let value = db.get(&rtxn, key).map_err(|e| lmdb_error(e.to_string()))?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    fn put(&self, entity: &str, key: &[u8], value: &[u8]) -> Result<(), StatusCode> {
        let db = self.database(entity)?;
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error(e.to_string()))?;
        db.put(&mut wtxn, key, value).map_err(|e| lmdb_error(e.to_string()))?;
        wtxn.commit().map_err(|e| lmdb_error(e.to_string()))
    }

    fn delete(&self, entity: &str, key: &[u8]) -> Result<(), StatusCode> {
        let db = self.database(entity)?;
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error(e.to_string()))?;
        let existed = db.delete(&mut wtxn, key).map_err(|e| lmdb_error(e.to_string()))?;
        wtxn.commit().map_err(|e| lmdb_error(e.to_string()))?;
        if existed {
            Ok(())
        } else {
            Err(StatusCode::BlockNotFound)
        }
    }

    fn exists(&self, entity: &str, key: &[u8]) -> Result<bool, StatusCode> {
        Ok(self.get(entity, key)?.is_some())
    }

    fn create_entity(&self, entity: &str) -> Result<(), StatusCode> {
        if self.dbs.read().unwrap().contains_key(entity) {
            return Ok(());
        }
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error(e.to_string()))?;
        let db: Database<Bytes, Bytes> = heed3::DatabaseOpenOptions::new(&self.env)
            .types::<Bytes, Bytes>()
            .name(entity)
            .create(&mut wtxn)
            .map_err(|e| lmdb_error(e.to_string()))?;
        wtxn.commit().map_err(|e| lmdb_error(e.to_string()))?;
        self.dbs.write().unwrap().insert(entity.to_string(), db);
        Ok(())
    }

    fn remove_entity(&self, entity: &str) -> Result<(), StatusCode> {
        let db = self.database(entity)?;
        let mut wtxn = self.env.write_txn().map_err(|e| lmdb_error(e.to_string()))?;
        db.clear(&mut wtxn).map_err(|e| lmdb_error(e.to_string()))?;
        wtxn.commit().map_err(|e| lmdb_error(e.to_string()))?;
        self.dbs.write().unwrap().remove(entity);
        Ok(())
    }
}

impl Container for Persisted {
    fn new_block_tensor(&self, cell_type: CellType, dim: [i32; 6]) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(tensor_block(cell_type, dim, self.clock.now()))
    }

    fn new_block_kind(&self, kind: Kind) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(kind_block(kind)?)
    }

    fn new_block_filtered(&self, source: &Block, filter: &Block) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(filtered_block(source, filter)?)
    }

    fn new_block_from_item(&self, tuple_txn: &Transaction, item_name: &str) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(item_block(tuple_txn, item_name)?)
    }

    fn new_block_parsed(&self, text: &[u8], kind: Option<&Kind>) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(parsed_block(text, kind)?)
    }

    fn new_block_serialized(&self, source: &Block, format: &str) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(serialized_block(source, format, self.clock.now())?)
    }

    fn new_block_index(&self, cell_type: CellType) -> Result<Transaction, StatusCode> {
        self.reserve_and_acquire(index_block(cell_type, self.clock.now())?)
    }

    fn new_block_tuple_from_index(&self, index_txn: &Transaction) -> Result<Transaction, StatusCode> {
        let (tuple, view) = tuple_from_index(index_txn, self.clock.now())?;
        self.alloc.reserve(view.header.total_bytes as u64)?;
        let mut txn = self.pool.acquire()?;
        txn.attach_tuple(tuple, view);
        Ok(txn)
    }

    fn new_transaction(&self) -> Result<Transaction, StatusCode> {
        self.pool.acquire()
    }

    fn destroy_transaction(&self, txn: Transaction) -> Result<(), StatusCode> {
        if let Some(block) = &txn.block {
            self.alloc.release(block.header.total_bytes as u64);
        }
        self.pool.release(txn);
        Ok(())
    }

    fn get_native(&self, locator: &Locator, selector: GetSelector) -> Result<Transaction, StatusCode> {
        let (entity, key) = Self::require_entity_and_key(locator)?;
        let raw = self
            .get(entity, key.as_bytes())?
            .ok_or(StatusCode::BlockNotFound)?;
        let block = Block::from_bytes(&raw)?;
        if !block.check_hash() {
            return Err(StatusCode::BadBlock {
                reason: format!("stored value for {entity}/{key} failed hash verification"),
            });
        }
        let result = match selector {
            GetSelector::Whole => block,
            GetSelector::RowFilter(filter) => filtered_block(&block, filter)?,
            GetSelector::ItemName(_) => return Err(StatusCode::NotApplicable),
        };
        self.reserve_and_acquire(result)
    }

    fn header_native(&self, locator: &Locator) -> Result<Transaction, StatusCode> {
        // No cheaper path over LMDB than a full value fetch — heed3 hands
        // back the whole value slice regardless of how much of it we read.
        self.get_native(locator, GetSelector::Whole)
    }

    fn put_native(&self, locator: &Locator, block: Block, mode: WriteMode) -> Result<(), StatusCode> {
        let (entity, key) = Self::require_entity_and_key(locator)?;
        let exists = self.exists(entity, key.as_bytes())?;
        if mode.only_if_exists() && !exists {
            return Err(StatusCode::WriteForbidden {
                reason: format!("key {key} does not exist in entity {entity}"),
            });
        }
        if mode.only_if_not_exists() && exists {
            return Err(StatusCode::WriteForbidden {
                reason: format!("key {key} already exists in entity {entity}"),
            });
        }
        self.put(entity, key.as_bytes(), &block.to_bytes())
    }

    fn remove_native(&self, locator: &Locator) -> Result<(), StatusCode> {
        let (entity, key) = Self::require_entity_and_key(locator)?;
        self.delete(entity, key.as_bytes())
    }

    fn new_entity_native(&self, locator: &Locator) -> Result<(), StatusCode> {
        let entity = locator.entity.as_ref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "Persisted new_entity requires an entity name".into(),
        })?;
        let _ = &self.name;
        self.create_entity(entity.as_str())
    }
}

/// Classify an arbitrary byte buffer received over a channel boundary and
/// install it as a Block value — used by callers that bypass `new_block_*`
/// and write raw bytes straight into a Persisted entity (SPEC §4.3).
pub fn unwrap_into(persisted: &Persisted, entity: &str, key: &str, bytes: &[u8]) -> Result<(), StatusCode> {
    let block = unwrap_received(bytes, persisted.clock.now());
    persisted.put(entity, key.as_bytes(), &block.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jazz_types::Name;

    fn config(dir: &std::path::Path) -> LmdbConfig {
        LmdbConfig {
            persistence_path: dir.to_string_lossy().to_string(),
            map_size_mb: 16,
            max_readers: 8,
            max_dbs: 16,
            fixed_map: false,
            write_map: false,
            no_meta_sync: false,
            no_sync: true,
            map_async: false,
            no_lock: false,
            no_rd_ahead: false,
            no_mem_init: false,
        }
    }

    fn locator(entity: &str, key: &str) -> Locator {
        Locator {
            base: Name::new("main").unwrap(),
            entity: Some(Name::new(entity).unwrap()),
            key: Some(key.to_string()),
            attribute: None,
            extra: None,
        }
    }

    #[test]
    fn reserved_entities_exist_after_open() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persisted::open("main", &config(dir.path()), 32, 1 << 20, 1 << 24).unwrap();
        for entity in RESERVED_ENTITIES {
            assert!(p.exists(entity, b"anything").is_ok());
        }
    }

    #[test]
    fn put_then_get_roundtrips_and_verifies_hash() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persisted::open("main", &config(dir.path()), 32, 1 << 20, 1 << 24).unwrap();
        p.new_entity_native(&locator("scratch", "")).unwrap();

        let block = Block::new_tensor(CellType::Integer, [4, 0, 0, 0, 0, 0]);
        p.put_native(&locator("scratch", "k1"), block, WriteMode::default()).unwrap();

        let txn = p.get_native(&locator("scratch", "k1"), GetSelector::Whole).unwrap();
        assert_eq!(txn.block.as_ref().unwrap().header.cell_type, CellType::Integer);
        p.destroy_transaction(txn).unwrap();
    }

    #[test]
    fn corrupted_value_fails_hash_check_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persisted::open("main", &config(dir.path()), 32, 1 << 20, 1 << 24).unwrap();
        p.new_entity_native(&locator("scratch", "")).unwrap();
        p.put("scratch", b"broken", b"not a block").unwrap();

        let err = p.get_native(&locator("scratch", "broken"), GetSelector::Whole).unwrap_err();
        assert!(matches!(err, StatusCode::BadBlock { .. }));
    }

    #[test]
    fn missing_key_is_block_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persisted::open("main", &config(dir.path()), 32, 1 << 20, 1 << 24).unwrap();
        let err = p.get_native(&locator("sys", "missing"), GetSelector::Whole).unwrap_err();
        assert_eq!(err, StatusCode::BlockNotFound);
    }
}
