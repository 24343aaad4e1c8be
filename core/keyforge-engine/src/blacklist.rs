//! Blacklist matching over a team's already-loaded entry set.
//!
//! Matching is pure; the hit-counter increment happens at the call site
//! through the repository so it reaches the shared store.

use keyforge_store::{BlacklistEntry, BlacklistType};

/// Finds the entry matching `value` on the given dimension, if any.
///
/// Country values compare case-insensitively (ISO alpha-2); IPs and device
/// identifiers compare exactly.
#[must_use]
pub fn find_match<'a>(
    entries: &'a [BlacklistEntry],
    ty: BlacklistType,
    value: &str,
) -> Option<&'a BlacklistEntry> {
    entries.iter().find(|entry| {
        entry.ty == ty
            && match ty {
                BlacklistType::Country => entry.value.eq_ignore_ascii_case(value),
                _ => entry.value == value,
            }
    })
}

/// Returns true if any entry blacklists a country.
///
/// Used to skip the geolocation lookup entirely for teams that never
/// blacklist by country.
#[must_use]
pub fn has_country_entries(entries: &[BlacklistEntry]) -> bool {
    entries.iter().any(|e| e.ty == BlacklistType::Country)
}
