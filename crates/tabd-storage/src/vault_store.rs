use base64::{engine::general_purpose::STANDARD, Engine as _};
use tabd_core::storage::{validate_key, SecureStore, SecureStoreError};
use tracing::{debug, instrument};

use crate::vault::{KeyringVault, Vault, VaultError};

/// Vault service name entries are filed under.
pub const DEFAULT_SERVICE: &str = "tabd-native-host";

const PROBE_KEY: &str = "tabd-test-key";
const PROBE_VALUE: &str = "test";

/// Store that keeps each blob base64-encoded in the OS credential vault.
///
/// No local encryption happens here; the vault provides confidentiality and integrity.
pub struct VaultStore<V: Vault = KeyringVault> {
    service: String,
    vault: V,
}

impl VaultStore<KeyringVault> {
    pub fn keyring(service: impl Into<String>) -> Self {
        Self::new(service, KeyringVault)
    }
}

impl<V: Vault> VaultStore<V> {
    pub fn new(service: impl Into<String>, vault: V) -> Self {
        Self {
            service: service.into(),
            vault,
        }
    }

    /// Check the vault is durable, then write, read back and remove a throwaway entry.
    pub fn probe(&self) -> Result<(), SecureStoreError> {
        let unavailable = |reason: String| SecureStoreError::BackendUnavailable { reason };

        if !self.vault.is_persistent() {
            return Err(unavailable("vault entries do not survive a reboot".into()));
        }

        self.vault
            .set(&self.service, PROBE_KEY, PROBE_VALUE)
            .map_err(|e| unavailable(format!("probe write: {e}")))?;

        let read_back = self.vault.get(&self.service, PROBE_KEY);
        let cleanup = self.vault.delete(&self.service, PROBE_KEY);

        match read_back {
            Ok(value) if value == PROBE_VALUE => {}
            Ok(_) => return Err(unavailable("probe read back a different value".into())),
            Err(e) => return Err(unavailable(format!("probe read: {e}"))),
        }
        cleanup.map_err(|e| unavailable(format!("probe cleanup: {e}")))
    }
}

impl<V: Vault> SecureStore for VaultStore<V> {
    #[instrument(skip_all, fields(key = %key, service = %self.service))]
    fn store(&self, key: &str, data: &[u8]) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        // A miss on write means the vault refused the entry.
        self.vault
            .set(&self.service, key, &STANDARD.encode(data))
            .map_err(|err| SecureStoreError::BackendUnavailable {
                reason: err.to_string(),
            })?;
        debug!("vault entry written");
        Ok(())
    }

    #[instrument(skip_all, fields(key = %key, service = %self.service))]
    fn retrieve(&self, key: &str) -> Result<Vec<u8>, SecureStoreError> {
        validate_key(key)?;
        let encoded = self
            .vault
            .get(&self.service, key)
            .map_err(vault_err(key))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| SecureStoreError::InvalidData {
                reason: format!("vault entry is not base64: {e}"),
            })
    }

    #[instrument(skip_all, fields(key = %key, service = %self.service))]
    fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        self.vault
            .delete(&self.service, key)
            .map_err(vault_err(key))
    }
}

fn vault_err(key: &str) -> impl Fn(VaultError) -> SecureStoreError {
    let key = key.to_string();
    move |err| match err {
        VaultError::NoEntry => SecureStoreError::NotFound { key: key.clone() },
        VaultError::Unavailable(reason) => SecureStoreError::BackendUnavailable { reason },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{
        testing::{BrokenVault, SessionVault},
        InMemoryVault,
    };

    #[test]
    fn stores_base64_in_the_vault() {
        let vault = InMemoryVault::new();
        let store = VaultStore::new(DEFAULT_SERVICE, vault.clone());

        store.store("latest", b"\x00\xffbinary").expect("store");
        let raw = vault.get(DEFAULT_SERVICE, "latest").expect("raw entry");
        assert_eq!(raw, STANDARD.encode(b"\x00\xffbinary"));
        assert_eq!(store.retrieve("latest").expect("retrieve"), b"\x00\xffbinary");
    }

    #[test]
    fn missing_entries_are_not_found() {
        let store = VaultStore::new(DEFAULT_SERVICE, InMemoryVault::new());

        let err = store.retrieve("missing-key").expect_err("retrieve");
        assert!(matches!(err, SecureStoreError::NotFound { .. }));
        let err = store.delete("missing-key").expect_err("delete");
        assert!(matches!(err, SecureStoreError::NotFound { .. }));
    }

    #[test]
    fn undecodable_entry_is_invalid_data() {
        let vault = InMemoryVault::new();
        vault.set(DEFAULT_SERVICE, "latest", "%%%").expect("seed");
        let store = VaultStore::new(DEFAULT_SERVICE, vault);

        let err = store.retrieve("latest").expect_err("should fail");
        assert!(matches!(err, SecureStoreError::InvalidData { .. }));
    }

    #[test]
    fn probe_leaves_no_entries_behind() {
        let vault = InMemoryVault::new();
        let store = VaultStore::new(DEFAULT_SERVICE, vault.clone());

        store.probe().expect("probe");
        assert!(vault.is_empty());
    }

    #[test]
    fn probe_reports_unusable_vault() {
        let store = VaultStore::new(DEFAULT_SERVICE, BrokenVault);
        let err = store.probe().expect_err("probe should fail");
        assert!(matches!(err, SecureStoreError::BackendUnavailable { .. }));

        let err = store.store("latest", b"v").expect_err("store should fail");
        assert!(matches!(err, SecureStoreError::BackendUnavailable { .. }));
    }

    #[test]
    fn probe_rejects_vault_lost_on_reboot() {
        let vault = InMemoryVault::new();
        let store = VaultStore::new(DEFAULT_SERVICE, SessionVault(vault.clone()));

        let err = store.probe().expect_err("probe should fail");
        assert!(matches!(err, SecureStoreError::BackendUnavailable { .. }));
        assert!(vault.is_empty(), "probe must not write to a non-persistent vault");
    }

    #[test]
    fn refused_write_is_unavailable_not_missing() {
        let store = VaultStore::new(DEFAULT_SERVICE, RefusingVault);

        let err = store.store("latest", b"v").expect_err("store should fail");
        assert!(matches!(err, SecureStoreError::BackendUnavailable { .. }));
        let err = store.retrieve("latest").expect_err("retrieve should fail");
        assert!(matches!(err, SecureStoreError::NotFound { .. }));
    }

    /// Answers every call with `NoEntry`, as keyutils does when access is denied.
    struct RefusingVault;

    impl Vault for RefusingVault {
        fn set(&self, _: &str, _: &str, _: &str) -> Result<(), VaultError> {
            Err(VaultError::NoEntry)
        }
        fn get(&self, _: &str, _: &str) -> Result<String, VaultError> {
            Err(VaultError::NoEntry)
        }
        fn delete(&self, _: &str, _: &str) -> Result<(), VaultError> {
            Err(VaultError::NoEntry)
        }
    }
}
