//! Engine configuration.

use std::time::Duration;

/// Throttle tunables for the three granularities of the verification path.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Coarse per-source-IP throttle.
    pub ip_max_requests: u32,
    pub ip_window: Duration,
    /// Per-(team, raw license key) throttle; blunts key brute forcing.
    pub key_max_requests: u32,
    pub key_window: Duration,
    /// Per-(team, session-key hash) throttle; blunts session replay.
    /// Deliberately very restrictive.
    pub session_max_requests: u32,
    pub session_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_max_requests: 30,
            ip_window: Duration::from_secs(60),
            key_max_requests: 10,
            key_window: Duration::from_secs(60),
            session_max_requests: 1,
            session_window: Duration::from_secs(15 * 60),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Object-store bucket holding release binaries.
    pub bucket: String,
    /// Server-side secret keying every lookup hash. Shared across instances.
    pub lookup_secret: Vec<u8>,
    pub rate: RateLimitConfig,
}

impl EngineConfig {
    /// Creates a config with default throttles.
    #[must_use]
    pub fn new(bucket: impl Into<String>, lookup_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            bucket: bucket.into(),
            lookup_secret: lookup_secret.into(),
            rate: RateLimitConfig::default(),
        }
    }
}
