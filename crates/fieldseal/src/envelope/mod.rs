//! Versioned envelope encryption of individual string fields.
//!
//! # Ciphertext format
//!
//! ```text
//! base64( [version:1][nonce:12][ciphertext+tag] )
//! ```
//!
//! Version `0x01` (AES-256-GCM, fresh random 96-bit nonce per encryption) is
//! the only defined version. The version byte enables future algorithm
//! migration without breaking existing ciphertext, and doubles as the
//! discriminator between envelopes and values written before encryption
//! existed: a decoded envelope always starts with `0x01`, which no printable
//! legacy value can.
//!
//! Reads never fail on malformed stored data — see [`legacy`] for the
//! fallback chain.

pub mod codec;
pub mod legacy;

pub use codec::FieldCipher;
