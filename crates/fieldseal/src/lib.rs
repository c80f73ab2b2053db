//! `fieldseal` — authenticated field-level encryption for stored text.
//!
//! Sensitive text fields (titles, URLs, descriptions) are encrypted before
//! they are persisted and transparently recovered on read. The stored
//! representation is a versioned, self-describing envelope:
//!
//! ```text
//! base64( [version:1][nonce:12][ciphertext+tag] )
//! ```
//!
//! Reads also handle values written before encryption existed — plain text
//! or base64-wrapped text — via a heuristic fallback chain, so no migration
//! step is required to keep old rows readable.

pub mod config;
pub mod envelope;
pub mod keystore;

pub use config::Config;
pub use envelope::codec::{CipherError, FieldCipher};
pub use keystore::KeyStore;
