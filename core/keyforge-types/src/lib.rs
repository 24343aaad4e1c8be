//! Core type definitions for Keyforge.
//!
//! This crate defines the fundamental, store-agnostic types shared by the
//! verification engine and the HTTP surface:
//! - Tenant/entity identifiers (UUID v7)
//! - The closed rejection taxonomy and its HTTP status mapping
//!
//! Domain entities (licenses, releases, devices, ...) belong to
//! `keyforge-store`, not here.

mod ids;
mod reject;

pub use ids::{CustomerId, LicenseId, ProductId, ReleaseId, TeamId};
pub use reject::RejectReason;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
