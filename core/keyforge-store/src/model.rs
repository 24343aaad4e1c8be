//! Domain entities.
//!
//! These mirror the rows the management surface writes; the verification
//! core only reads them, with four narrow exceptions (expiration commit,
//! device heartbeat, blacklist hit counters, request log appends) exposed as
//! explicit [`super::Repository`] operations.

use chrono::{DateTime, Utc};
use keyforge_crypto::TeamKeypair;
use keyforge_types::{CustomerId, LicenseId, ProductId, ReleaseId, TeamId};
use serde::{Deserialize, Serialize};

/// Per-team policy knobs, set from the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSettings {
    /// Window over which distinct IPs count against a license's IP cap.
    /// Doubles as the request-log slice consulted for that count.
    pub ip_limit_window_secs: u64,
    /// How long after its last heartbeat a device still occupies a seat.
    pub device_timeout_secs: u64,
    /// When set, licenses with associated customers require a matching
    /// customer id on every request.
    pub strict_customers: bool,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            ip_limit_window_secs: 7 * 24 * 60 * 60,
            device_timeout_secs: 10 * 60,
            strict_customers: false,
        }
    }
}

/// Plan-level feature flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamLimits {
    /// Whether the team's plan includes classloader downloads.
    pub classloader_allowed: bool,
}

/// The tenant boundary. Soft-deletable: a deleted team resolves as absent.
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub settings: TeamSettings,
    pub limits: TeamLimits,
    pub keypair: TeamKeypair,
    pub blacklist: Vec<BlacklistEntry>,
}

impl Team {
    /// Returns true if the team has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// How a license expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ExpirationPolicy {
    /// Terminal: the license never expires.
    Never,
    /// Valid while `now <= expiration_date`.
    Date,
    /// Expiration date committed lazily on the first granted request, then
    /// behaves like `Date`.
    Duration { days: u32 },
}

/// What a `Duration` license's countdown is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationAnchor {
    /// Days counted from the license's creation.
    Creation,
    /// Days counted from the first successful verification.
    Activation,
}

/// A machine-bound software license.
///
/// The raw key is never stored; `key_hash` is its keyed lookup digest.
/// Invariant: once `expiration_date` is set for a `Duration` license it is
/// never recomputed.
#[derive(Debug, Clone)]
pub struct License {
    pub id: LicenseId,
    pub team_id: TeamId,
    pub key_hash: String,
    pub suspended: bool,
    pub expiration: ExpirationPolicy,
    pub expiration_date: Option<DateTime<Utc>>,
    pub expiration_anchor: ExpirationAnchor,
    /// Cap on distinct IPs within the team's IP-limit window, if any.
    pub max_ip_addresses: Option<u32>,
    /// Cap on concurrently active devices, if any.
    pub max_seats: Option<u32>,
    pub customer_ids: Vec<CustomerId>,
    pub product_ids: Vec<ProductId>,
    pub created_at: DateTime<Utc>,
}

/// A customer a license may be shared with (strict-customer policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub team_id: TeamId,
    pub name: String,
}

/// A product owned by a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub team_id: TeamId,
    pub name: String,
}

/// Publication state of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Draft,
    Archived,
    Published,
}

impl ReleaseStatus {
    /// Stable token used in response headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Archived => "archived",
            Self::Published => "published",
        }
    }
}

/// Binary metadata for a release's file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Key of the binary in the object store.
    pub object_key: String,
    /// Size in bytes.
    pub size: u64,
    /// Entry-point class name, when the artifact has one.
    pub main_class: Option<String>,
}

/// A release of a product. At most one release per product carries `latest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub product_id: ProductId,
    pub status: ReleaseStatus,
    pub version: String,
    pub latest: bool,
    /// When present, only these licenses may download the release.
    pub allowed_licenses: Option<Vec<LicenseId>>,
    pub file: Option<FileRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_download_at: Option<DateTime<Utc>>,
}

impl Release {
    /// Returns true if the release has a downloadable file attached.
    #[must_use]
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Dimension a blacklist entry matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistType {
    IpAddress,
    Country,
    DeviceIdentifier,
}

/// A team-scoped blacklist entry with a hit counter.
///
/// The counter increments by exactly one whenever a request is rejected by
/// this entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub ty: BlacklistType,
    pub value: String,
    pub hits: u64,
}

impl BlacklistEntry {
    /// Creates an entry with a zeroed hit counter.
    #[must_use]
    pub fn new(ty: BlacklistType, value: impl Into<String>) -> Self {
        Self {
            ty,
            value: value.into(),
            hits: 0,
        }
    }
}

/// A device heartbeat: one row per `(license, device identifier)` pair,
/// upserted on every successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub license_id: LicenseId,
    pub identifier: String,
    pub last_seen: DateTime<Utc>,
    pub last_ip: Option<String>,
    pub last_country: Option<String>,
}

impl Device {
    /// Returns true if the device heartbeat is within `timeout_secs` of
    /// `now`, i.e. the device currently occupies a seat.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        now.signed_duration_since(self.last_seen).num_seconds() <= timeout_secs as i64
    }
}

/// Append-only record of one verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    pub team_id: TeamId,
    pub license_id: Option<LicenseId>,
    /// Outcome detail token (`Valid` or a rejection reason).
    pub detail: String,
    pub ip: Option<String>,
    pub device_identifier: Option<String>,
    pub created_at: DateTime<Utc>,
}
