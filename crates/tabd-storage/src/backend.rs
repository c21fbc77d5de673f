//! Startup choice between the OS vault and encrypted files.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use tabd_core::storage::{SecureStore, SecureStoreError};
use tracing::{debug, info};

use crate::{
    passphrase::PassphraseFile,
    secure_file_store::EncryptedFileStore,
    vault::{KeyringVault, Vault},
    vault_store::VaultStore,
};

/// Which backend the host should run with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Encrypted files in the install directory; the vault is never touched.
    #[default]
    File,
    /// Vault when the probe succeeds, encrypted files otherwise.
    Auto,
    /// Vault only; fail when it is unusable.
    Vault,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "auto" => Ok(Self::Auto),
            "vault" | "keyring" => Ok(Self::Vault),
            other => Err(format!(
                "unknown backend {other:?} (expected file, auto or vault)"
            )),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Auto => "auto",
            Self::Vault => "vault",
        })
    }
}

/// The storage variant chosen for this process.
pub enum Backend<V: Vault = KeyringVault> {
    File(EncryptedFileStore),
    Vault(VaultStore<V>),
}

impl<V: Vault> Backend<V> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Vault(_) => "vault",
        }
    }
}

impl<V: Vault> SecureStore for Backend<V> {
    fn store(&self, key: &str, data: &[u8]) -> Result<(), SecureStoreError> {
        match self {
            Self::File(store) => store.store(key, data),
            Self::Vault(store) => store.store(key, data),
        }
    }

    fn retrieve(&self, key: &str) -> Result<Vec<u8>, SecureStoreError> {
        match self {
            Self::File(store) => store.retrieve(key),
            Self::Vault(store) => store.retrieve(key),
        }
    }

    fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        match self {
            Self::File(store) => store.delete(key),
            Self::Vault(store) => store.delete(key),
        }
    }
}

/// Pick the backend for `preference`.
///
/// The file variant ensures `<install_dir>/.passphrase` exists before returning;
/// the vault variant only ever touches the probe entry.
pub fn select_backend<V: Vault>(
    install_dir: &Path,
    preference: BackendPreference,
    vault: VaultStore<V>,
) -> Result<Backend<V>, SecureStoreError> {
    let backend = match preference {
        BackendPreference::File => open_files(install_dir)?,
        BackendPreference::Vault => {
            vault.probe()?;
            Backend::Vault(vault)
        }
        BackendPreference::Auto => match vault.probe() {
            Ok(()) => Backend::Vault(vault),
            Err(err) => {
                debug!(%err, "vault probe failed, falling back to encrypted files");
                open_files(install_dir)?
            }
        },
    };
    info!(%preference, backend = backend.kind(), "storage backend selected");
    Ok(backend)
}

fn open_files<V: Vault>(install_dir: &Path) -> Result<Backend<V>, SecureStoreError> {
    let provider = PassphraseFile::new(install_dir);
    EncryptedFileStore::open(install_dir, &provider).map(Backend::File)
}
