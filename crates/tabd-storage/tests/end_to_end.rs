use std::fs;

use tabd_core::storage::{SecureStore, SecureStoreError};
use tabd_storage::{
    codec, select_backend, vault::InMemoryVault, vault_store::VaultStore, BackendPreference,
};

const SNAPSHOT: &[u8] =
    br#"{"type":"text","text":"hello","timestamp":1,"url":"https://example.com","title":"t"}"#;

#[test]
fn snapshot_round_trips_then_detects_corruption() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = select_backend(
        dir.path(),
        BackendPreference::File,
        VaultStore::new("tabd-native-host", InMemoryVault::new()),
    )
    .expect("select backend");

    backend.store("latest", SNAPSHOT).expect("store");
    assert_eq!(backend.retrieve("latest").expect("retrieve"), SNAPSHOT);

    let path = dir.path().join("latest.enc");
    let mut record = fs::read(&path).expect("read record");
    assert_eq!(record.len(), codec::MIN_RECORD_LEN + SNAPSHOT.len());
    let last = record.len() - 1;
    record[last] ^= 0xff;
    fs::write(&path, &record).expect("corrupt record");

    assert_eq!(
        backend.retrieve("latest"),
        Err(SecureStoreError::AuthenticationFailed)
    );
}

#[test]
fn records_outlive_the_process_that_wrote_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    let vault = || VaultStore::new("tabd-native-host", InMemoryVault::new());

    let first = select_backend(dir.path(), BackendPreference::File, vault()).expect("first run");
    first.store("latest", SNAPSHOT).expect("store");
    let secret = fs::read(dir.path().join(".passphrase")).expect("secret");
    drop(first);

    let second = select_backend(dir.path(), BackendPreference::File, vault()).expect("second run");
    assert_eq!(second.retrieve("latest").expect("retrieve"), SNAPSHOT);
    assert_eq!(
        fs::read(dir.path().join(".passphrase")).expect("secret again"),
        secret
    );
}

#[test]
fn empty_install_dir_has_nothing_to_return() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = select_backend(
        dir.path(),
        BackendPreference::File,
        VaultStore::new("tabd-native-host", InMemoryVault::new()),
    )
    .expect("select backend");

    assert!(matches!(
        backend.retrieve("missing-key"),
        Err(SecureStoreError::NotFound { .. })
    ));
    assert!(matches!(
        backend.delete("missing-key"),
        Err(SecureStoreError::NotFound { .. })
    ));
}
