//! `store.toml` handling when opening a store from disk.

use tuplestore::{Durability, Store, StoreConfig, CONFIG_FILE_NAME};

use crate::common::TestDir;

#[test]
fn test_first_open_writes_default_config() {
    let dir = TestDir::new();
    let store = Store::open(dir.store_path()).unwrap();

    let written = std::fs::read_to_string(dir.store_path().join(CONFIG_FILE_NAME)).unwrap();
    assert!(written.contains("durability = \"immediate\""));
    assert_eq!(store.config(), &StoreConfig::default());
}

#[test]
fn test_hand_edited_config_is_honoured() {
    let dir = TestDir::new();
    std::fs::create_dir_all(dir.store_path()).unwrap();
    std::fs::write(
        dir.store_path().join(CONFIG_FILE_NAME),
        "durability = \"eventual\"\nscan_batch_size = 3\n",
    )
    .unwrap();

    let store = Store::open(dir.store_path()).unwrap();
    assert_eq!(store.config().durability, Durability::Eventual);
    assert_eq!(store.config().scan_batch_size, 3);
}

#[test]
fn test_malformed_config_fails_open() {
    let dir = TestDir::new();
    std::fs::create_dir_all(dir.store_path()).unwrap();
    std::fs::write(dir.store_path().join(CONFIG_FILE_NAME), "durability = [").unwrap();

    let err = Store::open(dir.store_path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
