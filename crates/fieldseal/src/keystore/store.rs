//! [`KeyStore`]: immutable holder of the active field-encryption key.

use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The store was constructed without key material.
    #[error("encryption key not loaded")]
    Unavailable,

    /// The configured key is not valid base64.
    #[error("ENCRYPTION_KEY is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// The decoded key material has an unexpected length.
    #[error("encryption key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
#[derive(Clone)]
pub struct KeyBytes(pub Box<[u8; KEY_LEN]>);

impl Drop for KeyBytes {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Holder of the single active key for the process lifetime.
///
/// The store is immutable after construction: the key is loaded once at
/// startup and only read afterwards, so `encrypt`/`decrypt` callers on
/// multiple threads share it through an `Arc` without any locking. There is
/// no rotate or unload operation; a key change means a process restart.
#[derive(Debug)]
pub struct KeyStore {
    key: Option<KeyBytes>,
}

impl KeyStore {
    /// Create a store holding the given raw key material.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if `key_bytes` is not exactly
    /// [`KEY_LEN`] bytes.
    pub fn with_key(key_bytes: &[u8]) -> Result<Self, KeyError> {
        if key_bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(key_bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        Ok(Self {
            key: Some(KeyBytes(buf)),
        })
    }

    /// Create a store with no key material.
    ///
    /// Every [`KeyStore::current`] call on such a store fails with
    /// [`KeyError::Unavailable`]. Used to represent a process whose key load
    /// failed, and in tests exercising that state.
    pub fn unloaded() -> Self {
        Self { key: None }
    }

    /// Returns `true` if key material is loaded.
    pub fn is_ready(&self) -> bool {
        self.key.is_some()
    }

    /// Borrow the active key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Unavailable`] if the store holds no key.
    pub fn current(&self) -> Result<&KeyBytes, KeyError> {
        self.key.as_ref().ok_or(KeyError::Unavailable)
    }
}
