use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::{rngs::OsRng, RngCore};
use tabd_core::storage::SecureStoreError;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

/// File name of the root secret inside the installation directory.
pub const PASSPHRASE_FILE: &str = ".passphrase";

/// Random bytes behind a freshly generated root secret.
const SECRET_LEN: usize = 32;

/// Long-lived secret every record key is derived from.
///
/// Held as the exact bytes read from disk; zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct RootSecret(Zeroizing<Vec<u8>>);

impl RootSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RootSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootSecret(..)")
    }
}

#[derive(Debug, Error)]
pub enum PassphraseError {
    #[error("failed to read root secret {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to persist root secret {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("root secret file {} is empty", .path.display())]
    Empty { path: PathBuf },
    #[error("secret provider unavailable: {0}")]
    Unavailable(String),
}

impl From<PassphraseError> for SecureStoreError {
    fn from(err: PassphraseError) -> Self {
        match err {
            PassphraseError::Empty { .. } => SecureStoreError::InvalidData {
                reason: err.to_string(),
            },
            other => SecureStoreError::Io {
                reason: other.to_string(),
            },
        }
    }
}

/// Supplies the root secret (a file next to the records in production; memory in tests).
pub trait SecretProvider: Send + Sync {
    fn get_or_create(&self) -> Result<RootSecret, PassphraseError>;
}

/// Root secret persisted as base64url text in `<install_dir>/.passphrase`.
#[derive(Debug, Clone)]
pub struct PassphraseFile {
    path: PathBuf,
}

impl PassphraseFile {
    pub fn new(install_dir: impl AsRef<Path>) -> Self {
        Self {
            path: install_dir.as_ref().join(PASSPHRASE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<RootSecret>, PassphraseError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Err(PassphraseError::Empty {
                path: self.path.clone(),
            }),
            Ok(bytes) => Ok(Some(RootSecret::new(bytes))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PassphraseError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write `secret` only if no secret exists yet; fails with `AlreadyExists` otherwise.
    fn write_new(&self, secret: &RootSecret) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no parent directory"))?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        restrict_to_owner(tmp.as_file())?;
        tmp.write_all(secret.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl SecretProvider for PassphraseFile {
    fn get_or_create(&self) -> Result<RootSecret, PassphraseError> {
        if let Some(existing) = self.read()? {
            return Ok(existing);
        }

        let secret = generate_secret();
        match self.write_new(&secret) {
            Ok(()) => {
                debug!(path = %self.path.display(), "created root secret");
                Ok(secret)
            }
            // Another process created it first; theirs is the one on disk.
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                self.read()?.ok_or_else(|| PassphraseError::Write {
                    path: self.path.clone(),
                    source: err,
                })
            }
            Err(source) => Err(PassphraseError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// In-memory provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecretProvider {
    inner: Arc<Mutex<Option<RootSecret>>>,
}

impl SecretProvider for InMemorySecretProvider {
    fn get_or_create(&self) -> Result<RootSecret, PassphraseError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| PassphraseError::Unavailable(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let secret = generate_secret();
        *guard = Some(secret.clone());
        Ok(secret)
    }
}

fn generate_secret() -> RootSecret {
    let mut bytes = Zeroizing::new([0u8; SECRET_LEN]);
    OsRng.fill_bytes(&mut bytes[..]);
    RootSecret::new(URL_SAFE.encode(&bytes[..]))
}

#[cfg(unix)]
pub(crate) fn restrict_to_owner(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub(crate) fn restrict_to_owner(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
