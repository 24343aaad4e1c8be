//! Chunked stream encryption keyed by a session secret.
//!
//! Release bytes are encrypted as they flow: each chunk coming off the blob
//! store becomes one ChaCha20-Poly1305 frame on the wire. Nothing buffers
//! the whole file, and backpressure propagates because the transform is a
//! plain `Stream` adapter over the source.
//!
//! Wire format:
//! - 8-byte random nonce prefix (once, at stream start)
//! - per chunk: `u32-be ciphertext length || ciphertext`
//!
//! The per-chunk nonce is `prefix(8) || counter(4, big-endian)`, so frames
//! cannot be reordered or replayed within a stream without failing the tag.

use crate::error::{CryptoError, CryptoResult};
use crate::session::SessionSecret;
use bytes::Bytes;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use futures::{Stream, StreamExt};
use rand::RngCore;
use std::pin::Pin;

/// Size of the random per-stream nonce prefix in bytes.
pub const NONCE_PREFIX_SIZE: usize = 8;

/// Size of the per-frame length header in bytes.
const LEN_SIZE: usize = 4;

/// Size of the AEAD tag in bytes.
const TAG_SIZE: usize = 16;

/// A boxed stream of byte chunks, as produced by blob storage and consumed
/// by the HTTP response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Encrypts a byte stream chunk-by-chunk for one session.
pub struct StreamEncryptor {
    cipher: ChaCha20Poly1305,
    prefix: [u8; NONCE_PREFIX_SIZE],
    counter: u32,
}

impl StreamEncryptor {
    /// Creates an encryptor with a random nonce prefix.
    #[must_use]
    pub fn new(secret: &SessionSecret) -> Self {
        let mut prefix = [0u8; NONCE_PREFIX_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut prefix);
        Self::with_prefix(secret, prefix)
    }

    /// Creates an encryptor with a fixed nonce prefix (tests).
    #[must_use]
    pub fn with_prefix(secret: &SessionSecret, prefix: [u8; NONCE_PREFIX_SIZE]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(secret.as_bytes().into()),
            prefix,
            counter: 0,
        }
    }

    /// Returns the stream header (the nonce prefix).
    #[must_use]
    pub fn header(&self) -> [u8; NONCE_PREFIX_SIZE] {
        self.prefix
    }

    /// Encrypts one chunk, returning a complete frame (`len || ciphertext`).
    ///
    /// # Errors
    ///
    /// Fails if the 32-bit frame counter would overflow; a stream never
    /// wraps its nonce space.
    pub fn encrypt_chunk(&mut self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = self.next_nonce()?;
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut frame = Vec::with_capacity(LEN_SIZE + ciphertext.len());
        frame.extend_from_slice(&(ciphertext.len() as u32).to_be_bytes());
        frame.extend_from_slice(&ciphertext);
        Ok(frame)
    }

    /// Lifts the encryptor over a byte stream.
    ///
    /// The returned stream yields the 8-byte header first, then one frame
    /// per source chunk. Source errors pass through unchanged; a crypto
    /// failure surfaces as `io::Error` and ends the stream.
    #[must_use]
    pub fn encrypt_stream(mut self, source: ByteStream) -> ByteStream {
        let header = futures::stream::iter([Ok(Bytes::copy_from_slice(&self.prefix))]);
        let body = source.map(move |next| {
            let plain = next?;
            self.encrypt_chunk(&plain)
                .map(Bytes::from)
                .map_err(std::io::Error::other)
        });
        Box::pin(header.chain(body))
    }

    fn next_nonce(&mut self) -> CryptoResult<Nonce> {
        let counter = self.counter;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| CryptoError::Encryption("frame counter exhausted".into()))?;

        let mut nonce = [0u8; 12];
        nonce[..NONCE_PREFIX_SIZE].copy_from_slice(&self.prefix);
        nonce[NONCE_PREFIX_SIZE..].copy_from_slice(&counter.to_be_bytes());
        Ok(Nonce::from(nonce))
    }
}

impl std::fmt::Debug for StreamEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEncryptor")
            .field("prefix", &hex::encode(self.prefix))
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

/// Decrypts frames produced by [`StreamEncryptor`] (client side and tests).
pub struct StreamDecryptor {
    cipher: ChaCha20Poly1305,
    prefix: [u8; NONCE_PREFIX_SIZE],
    counter: u32,
}

impl StreamDecryptor {
    /// Creates a decryptor from the stream header.
    #[must_use]
    pub fn from_header(secret: &SessionSecret, prefix: [u8; NONCE_PREFIX_SIZE]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(secret.as_bytes().into()),
            prefix,
            counter: 0,
        }
    }

    /// Decrypts the next frame's ciphertext (length header already split off).
    pub fn decrypt_chunk(&mut self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let counter = self.counter;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| CryptoError::Decryption("frame counter exhausted".into()))?;

        let mut nonce = [0u8; 12];
        nonce[..NONCE_PREFIX_SIZE].copy_from_slice(&self.prefix);
        nonce[NONCE_PREFIX_SIZE..].copy_from_slice(&counter.to_be_bytes());

        self.cipher
            .decrypt(&Nonce::from(nonce), ciphertext)
            .map_err(|_| {
                CryptoError::Decryption("frame rejected (wrong key or tampered data)".into())
            })
    }

    /// Decrypts a fully-collected encrypted stream back to plaintext.
    ///
    /// # Errors
    ///
    /// Fails on a missing/truncated header, a truncated frame, or any frame
    /// whose tag does not verify.
    pub fn decrypt_all(secret: &SessionSecret, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < NONCE_PREFIX_SIZE {
            return Err(CryptoError::Decryption("missing stream header".into()));
        }
        let mut prefix = [0u8; NONCE_PREFIX_SIZE];
        prefix.copy_from_slice(&data[..NONCE_PREFIX_SIZE]);
        let mut decryptor = Self::from_header(secret, prefix);

        let mut plaintext = Vec::new();
        let mut rest = &data[NONCE_PREFIX_SIZE..];
        while !rest.is_empty() {
            if rest.len() < LEN_SIZE {
                return Err(CryptoError::Decryption("truncated frame header".into()));
            }
            let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            rest = &rest[LEN_SIZE..];
            if len < TAG_SIZE || rest.len() < len {
                return Err(CryptoError::Decryption("truncated frame".into()));
            }
            plaintext.extend_from_slice(&decryptor.decrypt_chunk(&rest[..len])?);
            rest = &rest[len..];
        }
        Ok(plaintext)
    }
}
