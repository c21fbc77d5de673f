use std::{fs, path::PathBuf};

use crate::config::Config;
use color_eyre::Result;
use dirs::home_dir;
use tabd_clipboard::SecureStoreClipboardRepo;
use tabd_storage::{select_backend, vault_store::VaultStore, Backend};
use tracing::debug;

/// Resolve the default installation directory (`~/.tabd`).
pub fn default_data_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| color_eyre::eyre::eyre!("no home dir available"))?;
    Ok(home.join(".tabd"))
}

/// Installation directory from config, falling back to the default; created if missing.
pub fn install_dir(config: &Config) -> Result<PathBuf> {
    let dir = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Select the backend once and hand it to the clipboard repository.
pub fn open_repo(config: &Config) -> Result<SecureStoreClipboardRepo<Backend>> {
    let root = install_dir(config)?;
    debug!(?root, backend = %config.backend, "initializing storage");
    let backend = select_backend(
        &root,
        config.backend,
        VaultStore::keyring(config.vault_service()),
    )
    .map_err(|e| color_eyre::eyre::eyre!("storage initialization failed: {e}"))?;
    Ok(SecureStoreClipboardRepo::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabd_core::clipboard::{ClipboardData, ClipboardRepository};

    #[test]
    fn file_backend_repo_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            data_dir: Some(dir.path().join("install")),
            ..Config::default()
        };

        let repo = open_repo(&config).expect("open");
        let data = ClipboardData {
            kind: "text".into(),
            text: "hello".into(),
            ..ClipboardData::default()
        };
        repo.save_latest(&data).expect("save");

        assert!(dir.path().join("install").join("latest_clipboard.enc").exists());
        let reopened = open_repo(&config).expect("reopen");
        assert_eq!(reopened.latest().expect("load"), Some(data));
    }
}
