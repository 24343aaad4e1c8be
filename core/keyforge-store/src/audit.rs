//! The audit boundary: one structured outcome record per request.

use chrono::{DateTime, Utc};
use keyforge_types::{CustomerId, ProductId, ReleaseId};
use serde::Serialize;
use std::sync::Mutex;

/// Everything needed to reconstruct a verification decision later.
///
/// Carries lookup hashes, never raw keys.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub timestamp: DateTime<Utc>,
    /// The team path segment as received (may be malformed).
    pub team: String,
    pub valid: bool,
    /// `Valid` or the rejection reason token.
    pub detail: String,
    pub license_hash: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub product_id: Option<ProductId>,
    pub release_id: Option<ReleaseId>,
    pub ip: Option<String>,
    pub device_identifier: Option<String>,
}

/// Receives exactly one outcome per verification request.
pub trait AuditSink: Send + Sync {
    /// Records one outcome. Must not fail the request path.
    fn record(&self, outcome: &VerificationOutcome);
}

/// Audit sink that emits structured tracing events.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, outcome: &VerificationOutcome) {
        if outcome.valid {
            tracing::info!(
                team = %outcome.team,
                detail = %outcome.detail,
                license_hash = outcome.license_hash.as_deref().unwrap_or("-"),
                ip = outcome.ip.as_deref().unwrap_or("-"),
                device = outcome.device_identifier.as_deref().unwrap_or("-"),
                "verification granted"
            );
        } else {
            tracing::warn!(
                team = %outcome.team,
                detail = %outcome.detail,
                license_hash = outcome.license_hash.as_deref().unwrap_or("-"),
                ip = outcome.ip.as_deref().unwrap_or("-"),
                device = outcome.device_identifier.as_deref().unwrap_or("-"),
                "verification rejected"
            );
        }
    }
}

/// Collecting sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<VerificationOutcome>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<VerificationOutcome> {
        self.records.lock().expect("audit lock poisoned").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, outcome: &VerificationOutcome) {
        self.records
            .lock()
            .expect("audit lock poisoned")
            .push(outcome.clone());
    }
}
