//! # Volatile: the RAM-backed Container
//!
//! SPEC §4.5. Same CRUD contract as Persisted, backed by a plain in-memory
//! table instead of LMDB — no hash verification is forced on reads (callers
//! that want it call `check_hash` themselves), and there is no on-disk
//! durability. Used for `0-shot`-style scratch blocks and as the host for
//! Index blocks materialised by `new_block_tuple_from_index`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jazz_types::{CellType, StatusCode};

use crate::container::{format_block_text, parse_block_text, AllocAccounting, TransactionPool};
use crate::domain::block::{apply_filter, Block, HasNaPolicy, IndexMap, Payload};
use crate::domain::{Kind, Locator, Transaction, Tuple};
use crate::ports::inbound::{Container, GetSelector, WriteMode};
use crate::ports::outbound::{SystemTimeSource, TimeSource};

/// `entity -> key -> Block`, guarded by one `RwLock` — Volatile has no
/// per-entity database handles the way Persisted does, so a single map
/// guard is the whole of its concurrency story.
pub struct Volatile {
    name: String,
    entities: RwLock<HashMap<String, HashMap<String, Block>>>,
    pool: TransactionPool,
    alloc: AllocAccounting,
    clock: Arc<dyn TimeSource>,
}

impl Volatile {
    pub fn new(name: impl Into<String>, max_transactions: u32, warn_bytes: u64, fail_bytes: u64) -> Self {
        let name = name.into();
        Volatile {
            pool: TransactionPool::new(max_transactions, name.clone()),
            alloc: AllocAccounting::new(warn_bytes, fail_bytes),
            entities: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemTimeSource),
            name,
        }
    }

    fn reserve_and_acquire(&self, block: Block) -> Result<Transaction, StatusCode> {
        self.alloc.reserve(block.header.total_bytes as u64)?;
        let mut txn = self.pool.acquire()?;
        txn.attach(block);
        Ok(txn)
    }

    fn require_entity_and_key<'a>(locator: &'a Locator) -> Result<(&'a str, &'a str), StatusCode> {
        let entity = locator.entity.as_ref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "Volatile requires a locator with an entity".into(),
        })?;
        let key = locator.key.as_deref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "Volatile requires a locator with a key".into(),
        })?;
        Ok((entity.as_str(), key))
    }
}

impl Container for Volatile {
    fn new_block_tensor(&self, cell_type: CellType, dim: [i32; 6]) -> Result<Transaction, StatusCode> {
        let mut block = Block::new_tensor(cell_type, dim);
        block.close_block(HasNaPolicy::False, self.clock.now());
        self.reserve_and_acquire(block)
    }

    fn new_block_kind(&self, mut kind: Kind) -> Result<Transaction, StatusCode> {
        kind.audit()?;
        kind.close();
        self.reserve_and_acquire(kind.block)
    }

    fn new_block_filtered(&self, source: &Block, filter: &Block) -> Result<Transaction, StatusCode> {
        let result = apply_filter(source, filter)?;
        self.reserve_and_acquire(result)
    }

    fn new_block_from_item(&self, tuple_txn: &Transaction, item_name: &str) -> Result<Transaction, StatusCode> {
        let tuple = tuple_txn.tuple.as_ref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "transaction does not hold a Tuple".into(),
        })?;
        let item = tuple
            .item(item_name)
            .ok_or_else(|| StatusCode::WrongName { name: item_name.to_string() })?;
        self.reserve_and_acquire(item.block.clone())
    }

    fn new_block_parsed(&self, text: &[u8], kind: Option<&Kind>) -> Result<Transaction, StatusCode> {
        let block = parse_block_text(text)?;
        if let Some(k) = kind {
            if let Some(item) = k.items().first() {
                if item.cell_type != block.header.cell_type {
                    return Err(StatusCode::WrongType {
                        expected: "cell type matching the checked kind's sole item",
                        got: "parsed block cell type differs",
                    });
                }
            }
        }
        self.reserve_and_acquire(block)
    }

    fn new_block_serialized(&self, source: &Block, format: &str) -> Result<Transaction, StatusCode> {
        let text = format_block_text(source, format)?;
        let mut block = Block::new_tensor(CellType::Byte, [text.len() as i32, 0, 0, 0, 0, 0]);
        if let Some(bytes) = block.tensor_bytes_mut() {
            bytes.copy_from_slice(&text);
        }
        block.close_block(HasNaPolicy::False, self.clock.now());
        self.reserve_and_acquire(block)
    }

    fn new_block_index(&self, cell_type: CellType) -> Result<Transaction, StatusCode> {
        let map = match cell_type {
            CellType::IndexIntToInt => IndexMap::IntToInt(Default::default()),
            CellType::IndexIntToString => IndexMap::IntToString(Default::default()),
            CellType::IndexStringToInt => IndexMap::StringToInt(Default::default()),
            CellType::IndexStringToString => IndexMap::StringToString(Default::default()),
            _ => {
                return Err(StatusCode::WrongType {
                    expected: "one of the four Index cell types",
                    got: "a non-index cell type",
                })
            }
        };
        let mut block = Block::new_index(map);
        block.close_block(HasNaPolicy::False, self.clock.now());
        self.reserve_and_acquire(block)
    }

    fn new_block_tuple_from_index(&self, index_txn: &Transaction) -> Result<Transaction, StatusCode> {
        let block = index_txn.block.as_ref().ok_or(StatusCode::BlockNotFound)?;
        let Payload::Index(IndexMap::StringToString(map)) = &block.payload else {
            return Err(StatusCode::WrongType {
                expected: "a string-to-string Index block",
                got: "some other payload",
            });
        };

        let mut tuple = Tuple::new_tuple(0);
        for (key, value) in map {
            let mut item = Block::new_tensor(CellType::String, [1, 0, 0, 0, 0, 0]);
            let offset = item.intern_string(value);
            if let Some(bytes) = item.tensor_bytes_mut() {
                bytes[0..4].copy_from_slice(&offset.to_le_bytes());
            }
            item.close_block(HasNaPolicy::Auto, self.clock.now());
            tuple.add_item(key.clone(), item)?;
        }
        let levels = vec![0; tuple.items().len()];
        tuple.close_tuple(&levels, &[], None)?;

        let view = tuple.as_index_block();
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
        let result = {
            let entities = self.entities.read().unwrap();
            let block = entities
                .get(entity)
                .and_then(|table| table.get(key))
                .ok_or(StatusCode::BlockNotFound)?;
            match selector {
                GetSelector::Whole => block.clone(),
                GetSelector::RowFilter(filter) => apply_filter(block, filter)?,
                GetSelector::ItemName(_) => {
                    return Err(StatusCode::NotApplicable);
                }
            }
        };
        self.reserve_and_acquire(result)
    }

    fn header_native(&self, locator: &Locator) -> Result<Transaction, StatusCode> {
        // Volatile keeps everything in memory already, so there is no
        // separate cheap-header path the way Persisted has for its LMDB
        // value; a header fetch just clones the whole Block.
        self.get_native(locator, GetSelector::Whole)
    }

    fn put_native(&self, locator: &Locator, block: Block, mode: WriteMode) -> Result<(), StatusCode> {
        let (entity, key) = Self::require_entity_and_key(locator)?;
        let mut entities = self.entities.write().unwrap();
        let table = entities.entry(entity.to_string()).or_default();
        let exists = table.contains_key(key);
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
        table.insert(key.to_string(), block);
        Ok(())
    }

    fn remove_native(&self, locator: &Locator) -> Result<(), StatusCode> {
        let (entity, key) = Self::require_entity_and_key(locator)?;
        let mut entities = self.entities.write().unwrap();
        let table = entities.get_mut(entity).ok_or(StatusCode::BlockNotFound)?;
        table.remove(key).ok_or(StatusCode::BlockNotFound)?;
        Ok(())
    }

    fn new_entity_native(&self, locator: &Locator) -> Result<(), StatusCode> {
        let entity = locator.entity.as_ref().ok_or_else(|| StatusCode::WrongArguments {
            reason: "Volatile new_entity requires an entity name".into(),
        })?;
        self.entities.write().unwrap().entry(entity.as_str().to_string()).or_default();
        let _ = &self.name;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jazz_types::Name;

    fn volatile() -> Volatile {
        Volatile::new("0-shot", 64, 1 << 20, 1 << 24)
    }

    fn locator(entity: &str, key: &str) -> Locator {
        Locator {
            base: Name::new("0-shot").unwrap(),
            entity: Some(Name::new(entity).unwrap()),
            key: Some(key.to_string()),
            attribute: None,
            extra: None,
        }
    }

    #[test]
    fn put_then_get_roundtrips_a_block() {
        let v = volatile();
        v.new_entity_native(&locator("scratch", "")).unwrap();
        let block = Block::new_tensor(CellType::Integer, [4, 0, 0, 0, 0, 0]);
        v.put_native(&locator("scratch", "k1"), block, WriteMode::default()).unwrap();

        let txn = v.get_native(&locator("scratch", "k1"), GetSelector::Whole).unwrap();
        assert_eq!(txn.block.as_ref().unwrap().header.cell_type, CellType::Integer);
        v.destroy_transaction(txn).unwrap();
        assert_eq!(v.alloc.in_use_bytes(), 0);
    }

    #[test]
    fn only_if_not_exists_rejects_overwrite() {
        let v = volatile();
        let mode = WriteMode(crate::ports::inbound::write_mode::ONLY_IF_NOT_EXISTS);
        v.put_native(&locator("e", "k"), Block::new_tensor(CellType::Byte, [1, 0, 0, 0, 0, 0]), mode)
            .unwrap();
        let err = v
            .put_native(&locator("e", "k"), Block::new_tensor(CellType::Byte, [1, 0, 0, 0, 0, 0]), mode)
            .unwrap_err();
        assert!(matches!(err, StatusCode::WriteForbidden { .. }));
    }

    #[test]
    fn missing_key_is_block_not_found() {
        let v = volatile();
        let err = v.get_native(&locator("e", "missing"), GetSelector::Whole).unwrap_err();
        assert_eq!(err, StatusCode::BlockNotFound);
    }

    #[test]
    fn tuple_from_index_then_item_lookup() {
        let v = volatile();
        let mut map = std::collections::BTreeMap::new();
        map.insert("a".to_string(), "1".to_string());
        map.insert("b".to_string(), "2".to_string());
        let mut index_block = Block::new_index(IndexMap::StringToString(map));
        index_block.close_block(HasNaPolicy::False, 0);
        let mut index_txn = Transaction::empty("0-shot");
        index_txn.attach(index_block);

        let tuple_txn = v.new_block_tuple_from_index(&index_txn).unwrap();
        let item_txn = v.new_block_from_item(&tuple_txn, "a").unwrap();
        assert_eq!(item_txn.block.as_ref().unwrap().header.cell_type, CellType::String);

        v.destroy_transaction(item_txn).unwrap();
        v.destroy_transaction(tuple_txn).unwrap();
        v.destroy_transaction(index_txn).unwrap();
    }
}
