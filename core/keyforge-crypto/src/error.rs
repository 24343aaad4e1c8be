//! Error types for the session crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The session key blob could not be opened.
    ///
    /// Covers malformed input, a wrong key, and AEAD failures alike; the
    /// distinction never leaves the process.
    #[error("session key rejected")]
    InvalidSessionKey,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
