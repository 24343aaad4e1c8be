//! Keyed lookup hashing for license and session keys.
//!
//! The store keeps an HMAC-SHA256 digest of each license key instead of the
//! key itself, and rate limiting identifies session keys by the same
//! construction. The digest is deterministic across processes sharing the
//! server-side secret, and not reversible without it.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the keyed lookup hash of `value`, hex-encoded.
///
/// Same `(value, secret)` always yields the same digest, on any instance.
#[must_use]
pub fn lookup_hash(value: &str, secret: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(value.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
