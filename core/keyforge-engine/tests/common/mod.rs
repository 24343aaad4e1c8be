//! Shared world builder for engine tests.

#![allow(dead_code)]

use chrono::Utc;
use keyforge_crypto::{lookup_hash, seal_session_key_b64, SessionSecret, TeamKeypair};
use keyforge_engine::{EngineConfig, Verifier, VerifyRequest};
use keyforge_store::{
    Customer, FileRecord, GeoLookup, License, MemoryAuditSink, MemoryBlobStore,
    MemoryRepository, NoGeoLookup, Product, Release, ReleaseStatus, Team, TeamLimits,
    TeamSettings,
};
use keyforge_store::{ExpirationAnchor, ExpirationPolicy};
use keyforge_types::{CustomerId, LicenseId, ProductId, ReleaseId, TeamId};
use std::sync::Arc;

/// Raw license key seeded into every world.
pub const RAW_KEY: &str = "KEY-TEST-1234";

/// Lookup-hash secret shared by the world's verifier and seeding code.
pub const LOOKUP_SECRET: &[u8] = b"engine-test-secret";

/// Bucket the world's release file lives in.
pub const BUCKET: &str = "releases";

/// Body of the seeded release file.
pub const FILE_BODY: &[u8] = b"the release binary payload";

/// A fully-wired verifier over in-memory collaborators, seeded with one
/// team, one license, one product, and one published latest release.
pub struct World {
    pub repo: Arc<MemoryRepository>,
    pub blobs: Arc<MemoryBlobStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub verifier: Verifier,
    pub team: Team,
    pub license: License,
    pub product: Product,
    pub release: Release,
}

impl World {
    pub async fn new() -> Self {
        Self::with_geo(Arc::new(NoGeoLookup)).await
    }

    pub async fn with_geo(geo: Arc<dyn GeoLookup>) -> Self {
        let team = Team {
            id: TeamId::new(),
            name: "acme".to_string(),
            deleted_at: None,
            settings: TeamSettings::default(),
            limits: TeamLimits::default(),
            keypair: TeamKeypair::generate(),
            blacklist: vec![],
        };
        let product = Product {
            id: ProductId::new(),
            team_id: team.id,
            name: "forge-plugin".to_string(),
        };
        let license = License {
            id: LicenseId::new(),
            team_id: team.id,
            key_hash: lookup_hash(RAW_KEY, LOOKUP_SECRET),
            suspended: false,
            expiration: ExpirationPolicy::Never,
            expiration_date: None,
            expiration_anchor: ExpirationAnchor::Activation,
            max_ip_addresses: None,
            max_seats: None,
            customer_ids: vec![],
            product_ids: vec![product.id],
            created_at: Utc::now(),
        };
        let now = Utc::now();
        let release = Release {
            id: ReleaseId::new(),
            product_id: product.id,
            status: ReleaseStatus::Published,
            version: "1.0.0".to_string(),
            latest: true,
            allowed_licenses: None,
            file: Some(FileRecord {
                object_key: "forge-plugin/1.0.0.jar".to_string(),
                size: FILE_BODY.len() as u64,
                main_class: Some("com.acme.ForgePlugin".to_string()),
            }),
            created_at: now,
            updated_at: now,
            last_download_at: None,
        };

        let repo = Arc::new(MemoryRepository::new());
        repo.insert_team(team.clone()).await;
        repo.insert_license(license.clone()).await;
        repo.insert_product(product.clone()).await;
        repo.insert_release(release.clone()).await;

        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.insert(
            BUCKET,
            "forge-plugin/1.0.0.jar",
            bytes::Bytes::from_static(FILE_BODY),
        );

        let audit = Arc::new(MemoryAuditSink::new());
        let verifier = Verifier::new(
            repo.clone(),
            blobs.clone(),
            geo,
            audit.clone(),
            EngineConfig::new(BUCKET, LOOKUP_SECRET),
        );

        Self {
            repo,
            blobs,
            audit,
            verifier,
            team,
            license,
            product,
            release,
        }
    }

    /// A valid request with a fresh sealed session key.
    pub fn request(&self) -> VerifyRequest {
        self.request_with_secret().0
    }

    /// A valid request plus the session secret it was sealed with.
    pub fn request_with_secret(&self) -> (VerifyRequest, SessionSecret) {
        let secret = SessionSecret::random();
        let session_key = seal_session_key_b64(&self.team.keypair.public_bytes(), &secret)
            .expect("sealing cannot fail with a valid public key");
        let req = VerifyRequest {
            team_id: self.team.id.to_string(),
            license_key: RAW_KEY.to_string(),
            customer_id: None,
            product_id: self.product.id.to_string(),
            version: None,
            session_key,
            device_identifier: "device-a".to_string(),
            classloader: false,
            ip: Some("8.8.8.8".to_string()),
        };
        (req, secret)
    }

    /// Re-seeds the license after a mutation.
    pub async fn update_license(&mut self, f: impl FnOnce(&mut License)) {
        f(&mut self.license);
        self.repo.insert_license(self.license.clone()).await;
    }

    /// Re-seeds the team after a mutation.
    pub async fn update_team(&mut self, f: impl FnOnce(&mut Team)) {
        f(&mut self.team);
        self.repo.insert_team(self.team.clone()).await;
    }

    /// Re-seeds the release after a mutation.
    pub async fn update_release(&mut self, f: impl FnOnce(&mut Release)) {
        f(&mut self.release);
        self.repo.insert_release(self.release.clone()).await;
    }

    /// Seeds a customer and attaches it to the license.
    pub async fn attach_customer(&mut self, name: &str) -> CustomerId {
        let customer = Customer {
            id: CustomerId::new(),
            team_id: self.team.id,
            name: name.to_string(),
        };
        let id = customer.id;
        self.repo.insert_customer(customer).await;
        self.update_license(|l| l.customer_ids.push(id)).await;
        id
    }
}
