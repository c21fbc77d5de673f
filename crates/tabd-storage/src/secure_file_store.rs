use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tabd_core::storage::{validate_key, SecureStore, SecureStoreError};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::{
    codec,
    passphrase::{restrict_to_owner, RootSecret, SecretProvider},
};

/// Suffix of every record file.
pub const RECORD_EXTENSION: &str = "enc";

/// Encrypted file-backed store implementing the shared `SecureStore` contract.
///
/// Each key maps to `<root>/<key>.enc`, sealed by [`codec::encrypt`] under a
/// key derived from the root secret. Writes go through a temp file in the
/// same directory and an atomic rename, so readers never see a torn record.
pub struct EncryptedFileStore {
    root: PathBuf,
    secret: RootSecret,
}

impl EncryptedFileStore {
    /// Create the directory if needed and load (or create) the root secret.
    pub fn open(
        root: impl Into<PathBuf>,
        provider: &impl SecretProvider,
    ) -> Result<Self, SecureStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(storage_err)?;
        let secret = provider.get_or_create()?;
        debug!(root = %root.display(), "opened encrypted file store");
        Ok(Self { root, secret })
    }

    pub fn with_secret(root: impl Into<PathBuf>, secret: RootSecret) -> Self {
        Self {
            root: root.into(),
            secret,
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{RECORD_EXTENSION}"))
    }
}

impl SecureStore for EncryptedFileStore {
    #[instrument(skip_all, fields(key = %key))]
    fn store(&self, key: &str, data: &[u8]) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        let record = codec::encrypt(&self.secret, data)?;
        write_record(&self.root, &self.path_for(key), &record)?;
        debug!(bytes = record.len(), "record written");
        Ok(())
    }

    #[instrument(skip_all, fields(key = %key))]
    fn retrieve(&self, key: &str) -> Result<Vec<u8>, SecureStoreError> {
        validate_key(key)?;
        let record = fs::read(self.path_for(key)).map_err(|err| not_found_or(key, err))?;
        Ok(codec::decrypt(&self.secret, &record)?)
    }

    #[instrument(skip_all, fields(key = %key))]
    fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        fs::remove_file(self.path_for(key)).map_err(|err| not_found_or(key, err))
    }
}

fn write_record(dir: &Path, path: &Path, record: &[u8]) -> Result<(), SecureStoreError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(storage_err)?;
    restrict_to_owner(tmp.as_file()).map_err(storage_err)?;
    tmp.write_all(record).map_err(storage_err)?;
    tmp.as_file().sync_all().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn not_found_or(key: &str, err: std::io::Error) -> SecureStoreError {
    if err.kind() == ErrorKind::NotFound {
        SecureStoreError::NotFound {
            key: key.to_string(),
        }
    } else {
        storage_err(err)
    }
}

fn storage_err<E: ToString>(err: E) -> SecureStoreError {
    SecureStoreError::Io {
        reason: err.to_string(),
    }
}
