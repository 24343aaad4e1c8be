//! IP-cap and seat-cap checks, as pure functions over store snapshots.
//!
//! Both are lenient: an already-known IP or an already-active device is
//! never blocked, the cap only gates admission of *new* ones.
//! Two concurrent requests from two new IPs (or devices) can therefore both
//! pass a snapshot check; the cap is advisory, not a hard boundary.

use chrono::{DateTime, Utc};
use keyforge_store::Device;

/// Returns true if a request from `ip` is admissible under `cap`, given the
/// distinct IPs already seen in the window.
#[must_use]
pub fn ip_allowed(known_ips: &[String], ip: &str, cap: u32) -> bool {
    known_ips.iter().any(|known| known == ip) || (known_ips.len() as u32) < cap
}

/// Returns true if `identifier` is admissible as a seat under `cap`.
///
/// A device counts as an active seat while its last heartbeat is within
/// `timeout_secs` of `now`.
#[must_use]
pub fn seat_allowed(
    devices: &[Device],
    identifier: &str,
    now: DateTime<Utc>,
    timeout_secs: u64,
    cap: u32,
) -> bool {
    let mut active = 0u32;
    for device in devices {
        if device.is_active(now, timeout_secs) {
            if device.identifier == identifier {
                return true;
            }
            active += 1;
        }
    }
    active < cap
}
