use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("no vault entry")]
    NoEntry,
    #[error("vault unavailable: {0}")]
    Unavailable(String),
}

/// OS credential vault addressed by service + key, holding text values.
pub trait Vault: Send + Sync {
    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), VaultError>;
    fn get(&self, service: &str, key: &str) -> Result<String, VaultError>;
    fn delete(&self, service: &str, key: &str) -> Result<(), VaultError>;

    /// Whether entries survive a reboot.
    fn is_persistent(&self) -> bool {
        true
    }
}

/// Platform vault through the `keyring` crate
/// (macOS Keychain, Windows Credential Manager, Linux kernel keyutils).
///
/// Keyutils keyrings live in kernel memory and are gone after a reboot, so on
/// Linux this vault reports itself as not persistent.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringVault;

impl Vault for KeyringVault {
    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), VaultError> {
        entry(service, key)?
            .set_password(value)
            .map_err(keyring_err)
    }

    fn get(&self, service: &str, key: &str) -> Result<String, VaultError> {
        entry(service, key)?.get_password().map_err(keyring_err)
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), VaultError> {
        entry(service, key)?
            .delete_credential()
            .map_err(keyring_err)
    }

    fn is_persistent(&self) -> bool {
        cfg!(any(target_os = "macos", target_os = "ios", target_os = "windows"))
    }
}

fn entry(service: &str, key: &str) -> Result<keyring::Entry, VaultError> {
    keyring::Entry::new(service, key).map_err(keyring_err)
}

fn keyring_err(err: keyring::Error) -> VaultError {
    match err {
        keyring::Error::NoEntry => VaultError::NoEntry,
        other => VaultError::Unavailable(other.to_string()),
    }
}

/// In-memory vault for tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVault {
    inner: Arc<Mutex<HashMap<(String, String), String>>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, across all services.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), String>>, VaultError> {
        self.inner
            .lock()
            .map_err(|err| VaultError::Unavailable(format!("lock poisoned: {err}")))
    }
}

impl Vault for InMemoryVault {
    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), VaultError> {
        self.entries()?
            .insert((service.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn get(&self, service: &str, key: &str) -> Result<String, VaultError> {
        self.entries()?
            .get(&(service.to_string(), key.to_string()))
            .cloned()
            .ok_or(VaultError::NoEntry)
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), VaultError> {
        self.entries()?
            .remove(&(service.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or(VaultError::NoEntry)
    }
}
