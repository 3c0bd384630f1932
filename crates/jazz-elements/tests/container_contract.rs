//! Exercises the easy (string-path) `Container` CRUD contract against
//! Volatile and Persisted identically (SPEC §4.5 "Same CRUD contract as
//! Persisted"). One shared suite, run twice, so the two media can never
//! silently drift apart on the behavior callers actually depend on.

use jazz_elements::domain::config::LmdbConfig;
use jazz_elements::ports::inbound::{write_mode, GetSelector, WriteMode};
use jazz_elements::{Block, Container};
use jazz_types::{CellType, StatusCode};

fn lmdb_config(dir: &std::path::Path) -> LmdbConfig {
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

/// Runs the same sequence of easy-interface calls against any `Container`.
/// `base` must match the path prefix the container was told to serve.
fn run_contract_suite(container: &dyn Container, base: &str) {
    let entity_path = format!("//{base}/scratch");
    let key_path = format!("//{base}/scratch/k1");
    let missing_path = format!("//{base}/scratch/missing");

    container.new_entity(&entity_path).unwrap();

    let block = Block::new_tensor(CellType::Integer, [4, 0, 0, 0, 0, 0]);
    container.put(&key_path, block, WriteMode::default()).unwrap();

    let txn = container.get(&key_path, GetSelector::Whole).unwrap();
    assert_eq!(txn.block.as_ref().unwrap().header.cell_type, CellType::Integer);

    let header_txn = container.header(&key_path).unwrap();
    assert_eq!(header_txn.block.as_ref().unwrap().header.cell_type, CellType::Integer);

    let err = container.get(&missing_path, GetSelector::Whole).unwrap_err();
    assert_eq!(err, StatusCode::BlockNotFound);

    let exists_only_mode = WriteMode(write_mode::ONLY_IF_NOT_EXISTS);
    let conflict = Block::new_tensor(CellType::Byte, [1, 0, 0, 0, 0, 0]);
    let err = container.put(&key_path, conflict, exists_only_mode).unwrap_err();
    assert!(matches!(err, StatusCode::WriteForbidden { .. }));

    container.remove(&key_path).unwrap();
    let err = container.get(&key_path, GetSelector::Whole).unwrap_err();
    assert_eq!(err, StatusCode::BlockNotFound);
}

#[test]
fn volatile_satisfies_the_container_contract() {
    use jazz_elements::adapters::Volatile;

    let v = Volatile::new("ram", 32, 1 << 20, 1 << 24);
    run_contract_suite(&v, "ram");
}

#[test]
#[cfg(feature = "persisted")]
fn persisted_satisfies_the_container_contract() {
    use jazz_elements::adapters::Persisted;

    let dir = tempfile::tempdir().unwrap();
    let p = Persisted::open("lmdb", &lmdb_config(dir.path()), 32, 1 << 20, 1 << 24).unwrap();
    run_contract_suite(&p, "lmdb");
}

#[test]
fn copy_moves_a_block_between_entities_on_the_same_container() {
    use jazz_elements::adapters::Volatile;

    let v = Volatile::new("ram", 32, 1 << 20, 1 << 24);
    v.new_entity("//ram/src").unwrap();
    v.new_entity("//ram/dst").unwrap();

    let block = Block::new_tensor(CellType::Double, [2, 0, 0, 0, 0, 0]);
    v.put("//ram/src/k1", block, WriteMode::default()).unwrap();

    v.copy("//ram/dst/k1", "//ram/src/k1").unwrap();

    let txn = v.get("//ram/dst/k1", GetSelector::Whole).unwrap();
    assert_eq!(txn.block.as_ref().unwrap().header.cell_type, CellType::Double);
}
