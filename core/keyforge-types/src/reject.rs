//! The closed rejection taxonomy for verification requests.
//!
//! Every way a verification can fail is one variant here, and every variant
//! maps to exactly one HTTP status. Adding a rejection reason is a
//! compile-time-checked change: all `match` sites are exhaustive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a verification request was rejected.
///
/// Ordering of checks lives in the engine; this enum only names the terminal
/// outcomes and their HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Malformed team id or query payload.
    BadRequest,
    /// The session key ciphertext could not be opened with the team's key.
    InvalidSessionKey,
    /// One of the request throttles tripped.
    RateLimited,
    /// Team does not exist or is soft-deleted.
    TeamNotFound,
    /// The team's plan does not include the requested feature.
    FeatureDisabled,
    /// No license matches the supplied key.
    LicenseNotFound,
    /// The requested product is not attached to the license.
    ProductNotFound,
    /// No matching release (explicit version missing, or no latest).
    ReleaseNotFound,
    /// Strict-customer policy: no matching customer for the license.
    CustomerNotFound,
    /// The resolved release is still a draft.
    ReleaseDraft,
    /// The resolved release has been archived.
    ReleaseArchived,
    /// The release restricts access to specific licenses.
    ReleaseRestricted,
    /// The requesting IP is blacklisted by the team.
    IpBlacklisted,
    /// The requesting country is blacklisted by the team.
    CountryBlacklisted,
    /// The requesting device identifier is blacklisted by the team.
    DeviceBlacklisted,
    /// The license is suspended.
    LicenseSuspended,
    /// The license has expired.
    LicenseExpired,
    /// Admitting this IP would exceed the license's IP cap.
    MaximumIpAddresses,
    /// Admitting this device would exceed the license's seat cap.
    MaximumConcurrentSeats,
    /// Storage or streaming failure; details stay server-side.
    InternalError,
}

impl RejectReason {
    /// The HTTP status code this rejection responds with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest | Self::InvalidSessionKey => 400,
            Self::RateLimited => 429,
            Self::TeamNotFound
            | Self::LicenseNotFound
            | Self::ProductNotFound
            | Self::ReleaseNotFound
            | Self::CustomerNotFound => 404,
            Self::FeatureDisabled
            | Self::ReleaseDraft
            | Self::ReleaseArchived
            | Self::ReleaseRestricted
            | Self::IpBlacklisted
            | Self::CountryBlacklisted
            | Self::DeviceBlacklisted
            | Self::LicenseSuspended
            | Self::LicenseExpired
            | Self::MaximumIpAddresses
            | Self::MaximumConcurrentSeats => 403,
            Self::InternalError => 500,
        }
    }

    /// Stable detail token used in response envelopes and audit records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::InvalidSessionKey => "InvalidSessionKey",
            Self::RateLimited => "RateLimited",
            Self::TeamNotFound => "TeamNotFound",
            Self::FeatureDisabled => "FeatureDisabled",
            Self::LicenseNotFound => "LicenseNotFound",
            Self::ProductNotFound => "ProductNotFound",
            Self::ReleaseNotFound => "ReleaseNotFound",
            Self::CustomerNotFound => "CustomerNotFound",
            Self::ReleaseDraft => "ReleaseDraft",
            Self::ReleaseArchived => "ReleaseArchived",
            Self::ReleaseRestricted => "ReleaseRestricted",
            Self::IpBlacklisted => "IpBlacklisted",
            Self::CountryBlacklisted => "CountryBlacklisted",
            Self::DeviceBlacklisted => "DeviceBlacklisted",
            Self::LicenseSuspended => "LicenseSuspended",
            Self::LicenseExpired => "LicenseExpired",
            Self::MaximumIpAddresses => "MaximumIpAddresses",
            Self::MaximumConcurrentSeats => "MaximumConcurrentSeats",
            Self::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
