use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

/// Longest key accepted by any backend; keys double as file names.
pub const MAX_KEY_LEN: usize = 128;

/// Errors produced by secure storage implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecureStoreError {
    /// Requested key does not exist.
    #[error("entry not found for key: {key}")]
    NotFound { key: String },
    /// Key cannot be used as a record name.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
    /// Stored record is truncated or otherwise malformed.
    #[error("invalid stored data: {reason}")]
    InvalidData { reason: String },
    /// Integrity check failed: the record was tampered with or the root secret changed.
    #[error("authentication failed: record was modified or encrypted under a different secret")]
    AuthenticationFailed,
    /// The OS credential vault refused or could not serve the request.
    #[error("storage backend unavailable: {reason}")]
    BackendUnavailable { reason: String },
    /// Filesystem read/write/permission failure.
    #[error("i/o failure: {reason}")]
    Io { reason: String },
}

/// Contract for protected storage of opaque blobs, one blob per key.
///
/// Calls are synchronous and run to completion; callers serialize access.
pub trait SecureStore: Send + Sync {
    /// Persist a value under a key, replacing any existing entry.
    fn store(&self, key: &str, data: &[u8]) -> Result<(), SecureStoreError>;

    /// Retrieve the value for a key.
    fn retrieve(&self, key: &str) -> Result<Vec<u8>, SecureStoreError>;

    /// Remove a key and its value. Missing keys are reported as `NotFound`.
    fn delete(&self, key: &str) -> Result<(), SecureStoreError>;
}

/// Reject keys that cannot be used verbatim as a single file or vault entry name.
///
/// Allowed: ASCII alphanumerics, `_`, `-` and `.` (not leading), up to [`MAX_KEY_LEN`].
pub fn validate_key(key: &str) -> Result<(), SecureStoreError> {
    let invalid = |reason: &str| SecureStoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(invalid("key is too long"));
    }
    if key.starts_with('.') {
        return Err(invalid("key must not start with '.'"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(invalid(
            "allowed characters are ASCII letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}

/// In-memory secure store for tests and smoke runs.
/// Values are masked, not encrypted; never use outside tests.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecureStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, SecureStoreError> {
        self.inner.lock().map_err(|err| SecureStoreError::Io {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl SecureStore for InMemorySecureStore {
    fn store(&self, key: &str, data: &[u8]) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        self.entries()?.insert(key.to_string(), mask(data));
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Vec<u8>, SecureStoreError> {
        validate_key(key)?;
        let map = self.entries()?;
        let masked = map.get(key).ok_or_else(|| SecureStoreError::NotFound {
            key: key.to_string(),
        })?;
        Ok(mask(masked))
    }

    fn delete(&self, key: &str) -> Result<(), SecureStoreError> {
        validate_key(key)?;
        self.entries()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| SecureStoreError::NotFound {
                key: key.to_string(),
            })
    }
}

const MASK_BYTE: u8 = 0xA5;

// XOR is its own inverse.
fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}
