//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! Every encryption call generates a fresh random 96-bit nonce via the OS
//! CSPRNG. **Nonce reuse under the same key is catastrophic for GCM** — it
//! breaks both confidentiality and authentication — so the nonce is never
//! derived, cached, or counter-based here.
//!
//! Decryption serves three populations of stored values with no out-of-band
//! marker: current envelopes, pre-encryption plain text, and pre-encryption
//! base64-wrapped text. The envelope path is tried first (base64 decode,
//! version byte, AEAD authentication must all pass); any rejection falls
//! through to the legacy chain in [`legacy`], ending in a passthrough of the
//! stored value. Old or corrupted data therefore never breaks a read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;

use super::legacy;
use crate::keystore::store::{KeyBytes, KeyStore};

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Version byte marking an AES-256-GCM envelope.
pub const VERSION_AES_GCM: u8 = 0x01;

/// A parsed encrypted field value.
///
/// The stored representation is `base64(version ‖ nonce ‖ ciphertext+tag)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encode this value to its canonical stored representation.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(1 + NONCE_LEN + self.ciphertext.len());
        raw.push(VERSION_AES_GCM);
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.ciphertext);
        STANDARD.encode(raw)
    }

    /// Parse a stored string back into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::NotBase64`] if the string is not valid
    /// base64, [`EnvelopeError::WrongVersion`] if the decoded bytes do not
    /// start with [`VERSION_AES_GCM`], or [`EnvelopeError::TooShort`] if
    /// nothing follows the version byte and nonce.
    pub fn parse(stored: &str) -> Result<Self, EnvelopeError> {
        let raw = STANDARD
            .decode(stored)
            .map_err(|_| EnvelopeError::NotBase64)?;
        if raw.first() != Some(&VERSION_AES_GCM) {
            return Err(EnvelopeError::WrongVersion);
        }
        if raw.len() <= 1 + NONCE_LEN {
            return Err(EnvelopeError::TooShort);
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&raw[1..1 + NONCE_LEN]);
        Ok(Self {
            nonce,
            ciphertext: raw[1 + NONCE_LEN..].to_vec(),
        })
    }
}

/// Reasons a stored value is rejected by the envelope path.
///
/// Never surfaced to callers: each variant routes [`FieldCipher::decrypt`]
/// into the legacy fallback chain instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The stored string is not valid base64.
    #[error("not valid base64")]
    NotBase64,

    /// The decoded bytes do not start with a known version byte.
    #[error("unknown version byte")]
    WrongVersion,

    /// The decoded bytes end inside the nonce.
    #[error("truncated envelope")]
    TooShort,

    /// AES-GCM authentication failed (wrong key or tampered data).
    #[error("authentication failed")]
    AuthFailed,

    /// Authentication passed but the plaintext is not valid UTF-8.
    #[error("plaintext is not valid UTF-8")]
    NotUtf8,
}

/// Errors surfaced by [`FieldCipher`] operations.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key store holds no key. The only error a caller can observe on
    /// either operation; content never causes failure.
    #[error("no encryption key is loaded")]
    KeyUnavailable,

    /// AES-GCM encryption failed (unreachable with a valid key and any
    /// realistic field size).
    #[error("aead operation failed")]
    AeadFailure,
}

/// Authenticated codec for individual text fields.
///
/// Stateless across calls apart from the shared immutable [`KeyStore`] and a
/// fallback counter, so a single instance may be used concurrently from any
/// number of threads.
#[derive(Debug)]
pub struct FieldCipher {
    keys: Arc<KeyStore>,
    legacy_fallbacks: AtomicU64,
}

impl FieldCipher {
    /// Create a codec over the given key store.
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self {
            keys,
            legacy_fallbacks: AtomicU64::new(0),
        }
    }

    /// Encrypt a plaintext field into its stored envelope representation.
    ///
    /// Any UTF-8 input is acceptable, including the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`] if the store holds no key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let key = self
            .keys
            .current()
            .map_err(|_| CipherError::KeyUnavailable)?;
        let cipher = build_cipher(key);

        // Use OsRng for a cryptographically secure random nonce.
        use aes_gcm::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::AeadFailure)?;

        let envelope = Envelope {
            nonce: nonce_bytes,
            ciphertext,
        };
        Ok(envelope.encode())
    }

    /// Decrypt a stored value back to readable text.
    ///
    /// Resolution order, first match wins:
    ///
    /// 1. version-`0x01` envelope (must base64-decode, carry the version
    ///    byte, and authenticate);
    /// 2. legacy base64-wrapped text, returned unwrapped;
    /// 3. legacy plain text, returned unchanged;
    /// 4. passthrough — the stored value itself, unchanged.
    ///
    /// The readability check always runs on the candidate plaintext, i.e.
    /// on the *decoded* bytes when the value base64-decodes. The unwrap
    /// attempt therefore comes before the raw-text branch: a base64-wrapped
    /// value is itself printable ASCII and would otherwise never be
    /// unwrapped.
    ///
    /// Malformed or corrupted data is never an error: an opaque unreadable
    /// string is preferable to blocking the read. Nothing is rewritten here.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`] if the store holds no key.
    pub fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        let key = self
            .keys
            .current()
            .map_err(|_| CipherError::KeyUnavailable)?;

        let rejected = match open_envelope(stored, key) {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) => e,
        };

        self.legacy_fallbacks.fetch_add(1, Ordering::Relaxed);

        if let Some(text) = legacy::as_base64_text(stored) {
            debug!(reason = %rejected, branch = "base64", "stored value handled as legacy base64 text");
            return Ok(text);
        }
        if let Some(text) = legacy::as_plaintext(stored) {
            debug!(reason = %rejected, branch = "plaintext", "stored value handled as legacy text");
            return Ok(text.to_owned());
        }
        debug!(reason = %rejected, branch = "passthrough", "stored value unrecognised; returning it unchanged");
        Ok(stored.to_owned())
    }

    /// Returns `true` if `stored` is a well-formed envelope that
    /// authenticates under the active key.
    ///
    /// Used by migration tooling to skip values that are already encrypted.
    /// `false` when no key is loaded.
    pub fn is_encrypted(&self, stored: &str) -> bool {
        match self.keys.current() {
            Ok(key) => open_envelope(stored, key).is_ok(),
            Err(_) => false,
        }
    }

    /// Number of decrypt calls served by a non-envelope branch since this
    /// codec was created. Tracks migration progress of pre-encryption rows.
    pub fn legacy_fallbacks(&self) -> u64 {
        self.legacy_fallbacks.load(Ordering::Relaxed)
    }
}

/// Run the envelope path over a stored value: parse, authenticate, decode.
fn open_envelope(stored: &str, key: &KeyBytes) -> Result<String, EnvelopeError> {
    let envelope = Envelope::parse(stored)?;
    let cipher = build_cipher(key);
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&envelope.nonce),
            envelope.ciphertext.as_ref(),
        )
        .map_err(|_| EnvelopeError::AuthFailed)?;
    String::from_utf8(plaintext).map_err(|_| EnvelopeError::NotUtf8)
}

fn build_cipher(key: &KeyBytes) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0[..]))
}
