//! Core abstractions for Tab'd: the clipboard record and secure storage contracts.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod clipboard;
pub mod storage;
