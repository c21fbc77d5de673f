//! Record encryption: Argon2id per-record key derivation plus AES-256-GCM.
//!
//! Layout of a sealed record:
//!
//! ```text
//! salt (16) | nonce (12) | ciphertext (plaintext length) | tag (16)
//! ```
//!
//! Salt and nonce are drawn from the OS RNG on every call, so sealing the
//! same plaintext twice never produces the same record.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use tabd_core::storage::SecureStoreError;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::passphrase::RootSecret;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// Bytes in front of the ciphertext.
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;
/// Smallest well-formed record: header plus the tag of an empty plaintext.
pub const MIN_RECORD_LEN: usize = HEADER_LEN + TAG_LEN;

// Argon2id cost; changing any of these breaks every record already on disk.
const KDF_TIME_COST: u32 = 1;
const KDF_MEMORY_KIB: u32 = 64 * 1024;
const KDF_PARALLELISM: u32 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("record is {len} bytes, shorter than the minimum of {min}", min = MIN_RECORD_LEN)]
    Truncated { len: usize },
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("key derivation failed: {0}")]
    Kdf(String),
    #[error("encryption failed")]
    Seal,
}

impl From<CodecError> for SecureStoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Truncated { .. } => SecureStoreError::InvalidData {
                reason: err.to_string(),
            },
            CodecError::AuthenticationFailed => SecureStoreError::AuthenticationFailed,
            CodecError::Kdf(_) | CodecError::Seal => SecureStoreError::Io {
                reason: err.to_string(),
            },
        }
    }
}

/// Derive the 32-byte record key for `salt` from the root secret.
pub fn derive_key(
    secret: &RootSecret,
    salt: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, CodecError> {
    let params = Params::new(
        KDF_MEMORY_KIB,
        KDF_TIME_COST,
        KDF_PARALLELISM,
        Some(KEY_LEN),
    )
    .map_err(|e| CodecError::Kdf(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon
        .hash_password_into(secret.as_bytes(), salt, &mut key[..])
        .map_err(|e| CodecError::Kdf(e.to_string()))?;
    Ok(key)
}

/// Seal `plaintext` into a self-contained record.
pub fn encrypt(secret: &RootSecret, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(secret, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CodecError::Seal)?;

    let mut record = Vec::with_capacity(HEADER_LEN + sealed.len());
    record.extend_from_slice(&salt);
    record.extend_from_slice(nonce.as_slice());
    record.extend_from_slice(&sealed);
    Ok(record)
}

/// Open a record produced by [`encrypt`].
///
/// Structurally short records fail with [`CodecError::Truncated`] before any
/// key derivation; a bad tag fails with [`CodecError::AuthenticationFailed`].
pub fn decrypt(secret: &RootSecret, record: &[u8]) -> Result<Vec<u8>, CodecError> {
    if record.len() < MIN_RECORD_LEN {
        return Err(CodecError::Truncated { len: record.len() });
    }

    let (salt, rest) = record.split_at(SALT_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let key = derive_key(secret, salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CodecError::AuthenticationFailed)
}
