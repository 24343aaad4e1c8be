//! JSON fixture loader.
//!
//! Seeds the in-memory repository and blob store from a single document so
//! the server binary is runnable end-to-end without external storage.
//! License keys appear raw in the fixture and are hashed at load time;
//! they are never kept in memory afterwards.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use keyforge_crypto::{lookup_hash, TeamKeypair};
use keyforge_engine::{EngineConfig, Verifier};
use keyforge_store::{
    BlacklistEntry, BlacklistType, Customer, ExpirationAnchor, ExpirationPolicy,
    FileRecord, License, MemoryBlobStore, MemoryRepository, NoGeoLookup, Product,
    Release, ReleaseStatus, Team, TeamLimits, TeamSettings, TracingAuditSink,
};
use keyforge_types::{CustomerId, LicenseId, ProductId, ReleaseId, TeamId};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Fixture {
    /// Secret keying the license-key lookup hash.
    pub lookup_secret: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub teams: Vec<TeamFixture>,
    #[serde(default)]
    pub customers: Vec<CustomerFixture>,
    #[serde(default)]
    pub products: Vec<ProductFixture>,
    #[serde(default)]
    pub licenses: Vec<LicenseFixture>,
    #[serde(default)]
    pub releases: Vec<ReleaseFixture>,
}

fn default_bucket() -> String {
    "releases".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TeamFixture {
    pub id: TeamId,
    pub name: String,
    /// Base64 of the 32 X25519 secret key bytes.
    pub secret_key: String,
    #[serde(default)]
    pub settings: TeamSettings,
    #[serde(default)]
    pub limits: TeamLimits,
    #[serde(default)]
    pub blacklist: Vec<BlacklistFixture>,
}

#[derive(Debug, Deserialize)]
pub struct BlacklistFixture {
    #[serde(rename = "type")]
    pub ty: BlacklistType,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerFixture {
    pub id: CustomerId,
    pub team_id: TeamId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    pub id: ProductId,
    pub team_id: TeamId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LicenseFixture {
    pub id: LicenseId,
    pub team_id: TeamId,
    /// Raw license key, hashed at load.
    pub key: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default = "default_expiration")]
    pub expiration: ExpirationPolicy,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default = "default_anchor")]
    pub expiration_anchor: ExpirationAnchor,
    #[serde(default)]
    pub max_ip_addresses: Option<u32>,
    #[serde(default)]
    pub max_seats: Option<u32>,
    #[serde(default)]
    pub customer_ids: Vec<CustomerId>,
    pub product_ids: Vec<ProductId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_expiration() -> ExpirationPolicy {
    ExpirationPolicy::Never
}

fn default_anchor() -> ExpirationAnchor {
    ExpirationAnchor::Activation
}

#[derive(Debug, Deserialize)]
pub struct ReleaseFixture {
    pub id: ReleaseId,
    pub product_id: ProductId,
    #[serde(default = "default_status")]
    pub status: ReleaseStatus,
    pub version: String,
    #[serde(default)]
    pub latest: bool,
    #[serde(default)]
    pub allowed_licenses: Option<Vec<LicenseId>>,
    pub object_key: String,
    #[serde(default)]
    pub main_class: Option<String>,
    /// Inline file body, stored verbatim in the blob store.
    pub body: String,
}

fn default_status() -> ReleaseStatus {
    ReleaseStatus::Published
}

impl Fixture {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing fixture JSON")
    }

    /// Seeds the in-memory stores and wires a verifier over them.
    pub async fn build(self) -> Result<AppState> {
        let repo = Arc::new(MemoryRepository::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let secret = self.lookup_secret.as_bytes().to_vec();

        for team in self.teams {
            let key_bytes = BASE64
                .decode(&team.secret_key)
                .with_context(|| format!("team {}: secret_key is not base64", team.id))?;
            let key_bytes: [u8; 32] = key_bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("team {}: secret_key must be 32 bytes", team.id))?;
            repo.insert_team(Team {
                id: team.id,
                name: team.name,
                deleted_at: None,
                settings: team.settings,
                limits: team.limits,
                keypair: TeamKeypair::from_secret_bytes(key_bytes),
                blacklist: team
                    .blacklist
                    .into_iter()
                    .map(|b| BlacklistEntry::new(b.ty, &b.value))
                    .collect(),
            })
            .await;
        }

        for customer in self.customers {
            repo.insert_customer(Customer {
                id: customer.id,
                team_id: customer.team_id,
                name: customer.name,
            })
            .await;
        }

        for product in self.products {
            repo.insert_product(Product {
                id: product.id,
                team_id: product.team_id,
                name: product.name,
            })
            .await;
        }

        for license in self.licenses {
            if license.key.trim().is_empty() {
                bail!("license {} has an empty key", license.id);
            }
            repo.insert_license(License {
                id: license.id,
                team_id: license.team_id,
                key_hash: lookup_hash(license.key.trim(), &secret),
                suspended: license.suspended,
                expiration: license.expiration,
                expiration_date: license.expiration_date,
                expiration_anchor: license.expiration_anchor,
                max_ip_addresses: license.max_ip_addresses,
                max_seats: license.max_seats,
                customer_ids: license.customer_ids,
                product_ids: license.product_ids,
                created_at: license.created_at.unwrap_or_else(Utc::now),
            })
            .await;
        }

        let now = Utc::now();
        for release in self.releases {
            let body = Bytes::from(release.body.into_bytes());
            blobs.insert(&self.bucket, &release.object_key, body.clone());
            repo.insert_release(Release {
                id: release.id,
                product_id: release.product_id,
                status: release.status,
                version: release.version,
                latest: release.latest,
                allowed_licenses: release.allowed_licenses,
                file: Some(FileRecord {
                    object_key: release.object_key,
                    size: body.len() as u64,
                    main_class: release.main_class,
                }),
                created_at: now,
                updated_at: now,
                last_download_at: None,
            })
            .await;
        }

        let verifier = Verifier::new(
            repo,
            blobs,
            Arc::new(NoGeoLookup),
            Arc::new(TracingAuditSink),
            EngineConfig::new(&self.bucket, secret.as_slice()),
        );

        Ok(AppState {
            verifier: Arc::new(verifier),
        })
    }
}
