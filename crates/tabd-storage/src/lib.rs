//! Concrete storage backends with protection at rest.
//! Encrypted files (Argon2id + AES-256-GCM under a local root secret) or the OS credential vault.

pub mod backend;
pub mod codec;
pub mod passphrase;
pub mod secure_file_store;
pub mod vault;
pub mod vault_store;

pub use backend::{select_backend, Backend, BackendPreference};
