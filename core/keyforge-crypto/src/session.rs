//! Per-request session keys, sealed to a team's X25519 keypair.
//!
//! The client picks a 32-byte symmetric secret for the session, seals it to
//! the team's public key, and sends the blob alongside the request. The
//! server opens it with the team's private key and uses the secret to key the
//! outgoing stream cipher.
//!
//! Wire format of a sealed blob:
//! `ephemeral_pk(32) || nonce(24) || aead_ciphertext`

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crypto_box::{
    aead::{generic_array::GenericArray, Aead, AeadCore},
    PublicKey, SalsaBox, SecretKey,
};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a session secret in bytes (256 bits).
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of an X25519 public key in bytes.
const PUBLIC_KEY_SIZE: usize = 32;

/// Size of the sealed-box nonce in bytes.
const NONCE_SIZE: usize = 24;

/// A client-chosen symmetric session secret, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionSecret {
    bytes: [u8; SESSION_KEY_SIZE],
}

impl SessionSecret {
    /// Creates a session secret from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Generates a random session secret (client side and tests).
    #[must_use]
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; SESSION_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A team's X25519 keypair. The secret half is used only to open session
/// keys; `crypto_box::SecretKey` zeroizes itself on drop.
#[derive(Clone)]
pub struct TeamKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl TeamKeypair {
    /// Generates a fresh keypair.
    #[must_use]
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Reconstructs a keypair from the stored secret bytes.
    #[must_use]
    pub fn from_secret_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        let secret = SecretKey::from(bytes);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Returns the public half, as handed to clients.
    #[must_use]
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        *self.public.as_bytes()
    }

    /// Returns the secret bytes, for persisting the keypair.
    #[must_use]
    pub fn secret_bytes(&self) -> [u8; SESSION_KEY_SIZE] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for TeamKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamKeypair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Seals `secret` to a team's public key (client side and tests).
///
/// Generates an ephemeral X25519 keypair per call; the blob is decryptable
/// only by the holder of the matching team secret key.
pub fn seal_session_key(
    team_public: &[u8; PUBLIC_KEY_SIZE],
    secret: &SessionSecret,
) -> CryptoResult<Vec<u8>> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let sealing_box = SalsaBox::new(&PublicKey::from(*team_public), &ephemeral);
    let nonce = SalsaBox::generate_nonce(&mut OsRng);

    let ciphertext = sealing_box
        .encrypt(&nonce, secret.as_bytes().as_slice())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(PUBLIC_KEY_SIZE + NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(ephemeral.public_key().as_bytes());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Seals a session secret and base64-encodes the blob for transport.
pub fn seal_session_key_b64(
    team_public: &[u8; PUBLIC_KEY_SIZE],
    secret: &SessionSecret,
) -> CryptoResult<String> {
    Ok(BASE64.encode(seal_session_key(team_public, secret)?))
}

/// Opens a sealed session key blob with the team's keypair.
///
/// # Errors
///
/// Any failure (short input, malformed point, AEAD rejection, wrong
/// plaintext length) returns [`CryptoError::InvalidSessionKey`]. The caller
/// learns nothing about which stage failed.
pub fn open_session_key(
    keypair: &TeamKeypair,
    blob: &[u8],
) -> CryptoResult<SessionSecret> {
    if blob.len() <= PUBLIC_KEY_SIZE + NONCE_SIZE {
        return Err(CryptoError::InvalidSessionKey);
    }

    let mut ephemeral_pk = [0u8; PUBLIC_KEY_SIZE];
    ephemeral_pk.copy_from_slice(&blob[..PUBLIC_KEY_SIZE]);
    let nonce_bytes = &blob[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + NONCE_SIZE];
    let ciphertext = &blob[PUBLIC_KEY_SIZE + NONCE_SIZE..];

    let opening_box = SalsaBox::new(&PublicKey::from(ephemeral_pk), &keypair.secret);
    let plaintext = opening_box
        .decrypt(GenericArray::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::InvalidSessionKey)?;

    let bytes: [u8; SESSION_KEY_SIZE] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidSessionKey)?;
    Ok(SessionSecret::from_bytes(bytes))
}

/// Opens a base64-encoded sealed session key blob.
pub fn open_session_key_b64(
    keypair: &TeamKeypair,
    encoded: &str,
) -> CryptoResult<SessionSecret> {
    let blob = BASE64
        .decode(encoded.trim())
        .map_err(|_| CryptoError::InvalidSessionKey)?;
    open_session_key(keypair, &blob)
}
