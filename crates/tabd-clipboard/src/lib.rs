use anyhow::Result;
use tabd_core::{
    clipboard::{ClipboardData, ClipboardRepository},
    storage::{SecureStore, SecureStoreError},
};
use tracing::instrument;

/// Key the latest clipboard snapshot is stored under.
pub const LATEST_CLIPBOARD_KEY: &str = "latest_clipboard";

/// Clipboard repository backed by a `SecureStore` chosen at startup.
///
/// Owns the backend for the lifetime of the process.
pub struct SecureStoreClipboardRepo<S: SecureStore> {
    store: S,
}

impl<S: SecureStore> SecureStoreClipboardRepo<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }
}

impl<S: SecureStore> ClipboardRepository for SecureStoreClipboardRepo<S> {
    #[instrument(skip_all)]
    fn save_latest(&self, data: &ClipboardData) -> Result<()> {
        let bytes = serde_json::to_vec(data)?;
        self.store
            .store(LATEST_CLIPBOARD_KEY, &bytes)
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }

    #[instrument(skip_all)]
    fn latest(&self) -> Result<Option<ClipboardData>> {
        match self.store.retrieve(LATEST_CLIPBOARD_KEY) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(SecureStoreError::NotFound { .. }) => Ok(None),
            Err(err) => Err(anyhow::anyhow!(err.to_string())),
        }
    }

    #[instrument(skip_all)]
    fn clear(&self) -> Result<bool> {
        match self.store.delete(LATEST_CLIPBOARD_KEY) {
            Ok(()) => Ok(true),
            Err(SecureStoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(anyhow::anyhow!(err.to_string())),
        }
    }
}
