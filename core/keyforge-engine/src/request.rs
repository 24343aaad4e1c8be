//! The parsed inbound verification request.

use keyforge_types::RejectReason;

/// One inbound verification/download request, as handed to the engine by
/// the HTTP layer. All identifiers are still raw strings; the engine owns
/// their validation so the ordering guarantees hold in one place.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    /// Team path segment, expected to be a UUID.
    pub team_id: String,
    /// Raw license key.
    pub license_key: String,
    /// Customer id, required only under the strict-customer policy.
    pub customer_id: Option<String>,
    /// Product id, expected to be a UUID.
    pub product_id: String,
    /// Explicit release version; absent means "latest".
    pub version: Option<String>,
    /// Base64 sealed session key blob.
    pub session_key: String,
    /// Caller-stable device identifier.
    pub device_identifier: String,
    /// Whether a classloader download was requested (plan-gated).
    pub classloader: bool,
    /// Source IP, when the transport could determine one.
    pub ip: Option<String>,
}

impl VerifyRequest {
    /// Validates payload shape: the required parameters must be present and
    /// non-empty. Semantic checks happen later in the pipeline.
    pub(crate) fn validate(&self) -> Result<(), RejectReason> {
        let required = [
            self.license_key.as_str(),
            self.product_id.as_str(),
            self.session_key.as_str(),
            self.device_identifier.as_str(),
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(RejectReason::BadRequest);
        }
        if matches!(&self.version, Some(v) if v.trim().is_empty()) {
            return Err(RejectReason::BadRequest);
        }
        Ok(())
    }
}
