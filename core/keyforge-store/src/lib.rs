//! Domain model and storage boundary for Keyforge.
//!
//! The verification engine never talks to a database, an object store, or a
//! geolocation service directly. This crate defines those collaborators as
//! injected trait objects, constructed once at process start:
//!
//! - [`Repository`]: licenses, teams, products, releases, devices,
//!   blacklists, request logs. [`MemoryRepository`] is both the test fake
//!   and the fixture-seeded store the demo binary runs on.
//! - [`BlobStore`]: release binaries by `(bucket, key)`, fetched as lazy
//!   byte streams.
//! - [`GeoLookup`]: country resolution for an IP address.
//! - [`AuditSink`]: receives exactly one structured outcome per request.

mod audit;
mod blob;
mod error;
mod geo;
mod model;
mod repo;

pub use audit::{AuditSink, MemoryAuditSink, TracingAuditSink, VerificationOutcome};
pub use blob::{BlobStore, MemoryBlobStore};
pub use error::{StoreError, StoreResult};
pub use geo::{GeoLookup, NoGeoLookup, StaticGeoLookup, VisitorCountry};
pub use model::{
    BlacklistEntry, BlacklistType, Customer, Device, ExpirationAnchor, ExpirationPolicy,
    FileRecord, License, Product, Release, ReleaseStatus, RequestLog, Team, TeamLimits,
    TeamSettings,
};
pub use repo::{MemoryRepository, Repository};
