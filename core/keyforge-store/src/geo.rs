//! The geolocation-by-IP boundary.
//!
//! Only consulted when a team actually blacklists countries; the engine
//! skips the lookup entirely otherwise.

use std::collections::HashMap;

/// Country of a visiting IP address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorCountry {
    /// ISO 3166-1 alpha-2 code, uppercase.
    pub alpha2: String,
    /// ISO 3166-1 alpha-3 code, uppercase.
    pub alpha3: String,
}

impl VisitorCountry {
    /// Creates a country pair, normalizing to uppercase.
    #[must_use]
    pub fn new(alpha2: &str, alpha3: &str) -> Self {
        Self {
            alpha2: alpha2.to_ascii_uppercase(),
            alpha3: alpha3.to_ascii_uppercase(),
        }
    }
}

/// Resolves an IP address to a country.
pub trait GeoLookup: Send + Sync {
    /// Returns the country, or `None` when the IP cannot be resolved.
    fn resolve(&self, ip: &str) -> Option<VisitorCountry>;
}

/// A lookup that never resolves. Country blacklist entries simply never
/// match under it.
pub struct NoGeoLookup;

impl GeoLookup for NoGeoLookup {
    fn resolve(&self, _ip: &str) -> Option<VisitorCountry> {
        None
    }
}

/// Fixed-table lookup for tests and air-gapped deployments.
#[derive(Default)]
pub struct StaticGeoLookup {
    entries: HashMap<String, VisitorCountry>,
}

impl StaticGeoLookup {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an IP to a country.
    #[must_use]
    pub fn with(mut self, ip: &str, country: VisitorCountry) -> Self {
        self.entries.insert(ip.to_string(), country);
        self
    }
}

impl GeoLookup for StaticGeoLookup {
    fn resolve(&self, ip: &str) -> Option<VisitorCountry> {
        self.entries.get(ip).cloned()
    }
}
