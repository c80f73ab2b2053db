//! Key loading and in-memory storage.
//!
//! # Lifecycle
//!
//! 1. At startup, [`load`] decodes the base64 key from [`Config`] and seeds
//!    an immutable [`KeyStore`].
//! 2. The store is wrapped in an `Arc` and handed to every
//!    [`FieldCipher`](crate::envelope::codec::FieldCipher); the key is
//!    read-only for the rest of the process lifetime.
//! 3. A failed load is startup-fatal: callers must propagate the error and
//!    refuse to serve anything that needs encryption. There is no
//!    catch-and-continue path.
//!
//! # Security invariants
//!
//! - The raw key is **never** written to disk, logged, or included in
//!   traces ([`KeyBytes`](store::KeyBytes) redacts itself in `Debug`).
//! - Key memory is zeroed on drop.

pub mod store;

pub use store::{KeyStore, KEY_LEN};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::Config;
use store::KeyError;

/// Decode the configured base64 key and seed a [`KeyStore`].
///
/// # Errors
///
/// Returns [`KeyError::InvalidEncoding`] if the configured value is not
/// valid base64, or [`KeyError::InvalidLength`] if the decoded material is
/// not exactly [`KEY_LEN`] bytes.
pub fn load(cfg: &Config) -> Result<KeyStore, KeyError> {
    let raw = STANDARD.decode(cfg.encryption_key.trim())?;
    KeyStore::with_key(&raw)
}
