//! Fixed-window request throttling keyed by arbitrary strings.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Entries are pruned once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 4096;

struct Window {
    started: Instant,
    count: u32,
}

/// In-process fixed-window rate limiter.
///
/// `check` is atomic under concurrent callers incrementing the same key:
/// exactly `max_requests` calls pass per key per window, the next one is
/// limited, and an elapsed window resets the count lazily.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one request for `key` and returns true if it is over the
    /// limit.
    pub fn check(&self, key: &str, max_requests: u32, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);
        entry.count > max_requests
    }
}
