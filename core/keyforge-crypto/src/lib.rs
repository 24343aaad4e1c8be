//! Session crypto layer for Keyforge.
//!
//! This crate covers the three cryptographic concerns of the verification
//! path:
//! - **Session keys**: each request carries a client-chosen symmetric secret,
//!   sealed to the team's X25519 public key. Opening it is the only place the
//!   team's private key is used.
//! - **Lookup hashing**: license keys and session keys are never stored or
//!   logged raw; a keyed HMAC-SHA256 digest stands in for them everywhere.
//! - **Stream encryption**: release bytes are re-encrypted for the session
//!   chunk-by-chunk with ChaCha20-Poly1305, so the file is never buffered.
//!
//! Decryption failures are deliberately opaque: every way a session key can
//! fail to open collapses into [`CryptoError::InvalidSessionKey`].

mod error;
mod lookup;
mod session;
mod stream;

pub use error::{CryptoError, CryptoResult};
pub use lookup::lookup_hash;
pub use session::{
    open_session_key, open_session_key_b64, seal_session_key, seal_session_key_b64,
    SessionSecret, TeamKeypair, SESSION_KEY_SIZE,
};
pub use stream::{
    ByteStream, StreamDecryptor, StreamEncryptor, NONCE_PREFIX_SIZE,
};
