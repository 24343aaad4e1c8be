//! The repository boundary and its in-memory implementation.
//!
//! Handlers hold an `Arc<dyn Repository>`, constructed once at process
//! start. The production deployment backs this with the relational service;
//! [`MemoryRepository`] backs tests and the fixture-seeded demo binary.

use crate::error::{StoreError, StoreResult};
use crate::model::{
    BlacklistType, Customer, Device, License, Product, Release, RequestLog, Team,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyforge_types::{CustomerId, LicenseId, ProductId, ReleaseId, TeamId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Read/write access to license state, scoped to what the verification core
/// needs. Everything else (CRUD, billing, dashboards) lives elsewhere.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Loads a team by id. Soft-deleted teams resolve to `None`.
    async fn team(&self, id: TeamId) -> StoreResult<Option<Team>>;

    /// Loads a license by its keyed lookup hash within a team.
    async fn license_by_hash(
        &self,
        team_id: TeamId,
        key_hash: &str,
    ) -> StoreResult<Option<License>>;

    /// Loads the customers with the given ids.
    async fn customers(&self, ids: &[CustomerId]) -> StoreResult<Vec<Customer>>;

    /// Loads a product by id.
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Loads all releases of a product.
    async fn releases_of(&self, product_id: ProductId) -> StoreResult<Vec<Release>>;

    /// Loads all device heartbeats for a license.
    async fn devices_of(&self, license_id: LicenseId) -> StoreResult<Vec<Device>>;

    /// Distinct non-null IPs recorded for a license since `cutoff`.
    async fn distinct_ips_since(
        &self,
        license_id: LicenseId,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<String>>;

    /// Commits a license's expiration date, set-if-null.
    ///
    /// Returns the authoritative date: `date` if this call committed it, or
    /// the previously committed date unchanged. The date is never
    /// recomputed after commitment.
    async fn commit_expiration(
        &self,
        license_id: LicenseId,
        date: DateTime<Utc>,
    ) -> StoreResult<DateTime<Utc>>;

    /// Upserts the device heartbeat and touches the release's last-download
    /// timestamp as one transactional write.
    async fn record_delivery(
        &self,
        device: Device,
        release_id: ReleaseId,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Atomically increments the hit counter of a blacklist entry.
    async fn increment_blacklist_hit(
        &self,
        team_id: TeamId,
        ty: BlacklistType,
        value: &str,
    ) -> StoreResult<()>;

    /// Appends one request-log row.
    async fn append_request_log(&self, entry: RequestLog) -> StoreResult<()>;
}

#[derive(Default)]
struct Inner {
    teams: HashMap<TeamId, Team>,
    licenses: HashMap<LicenseId, License>,
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    releases: HashMap<ReleaseId, Release>,
    devices: HashMap<(LicenseId, String), Device>,
    request_logs: Vec<RequestLog>,
}

/// In-memory [`Repository`] over `tokio::sync::RwLock` maps.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a team.
    pub async fn insert_team(&self, team: Team) {
        self.inner.write().await.teams.insert(team.id, team);
    }

    /// Seeds a license.
    pub async fn insert_license(&self, license: License) {
        self.inner
            .write()
            .await
            .licenses
            .insert(license.id, license);
    }

    /// Seeds a customer.
    pub async fn insert_customer(&self, customer: Customer) {
        self.inner
            .write()
            .await
            .customers
            .insert(customer.id, customer);
    }

    /// Seeds a product.
    pub async fn insert_product(&self, product: Product) {
        self.inner
            .write()
            .await
            .products
            .insert(product.id, product);
    }

    /// Seeds a release.
    pub async fn insert_release(&self, release: Release) {
        self.inner
            .write()
            .await
            .releases
            .insert(release.id, release);
    }

    /// Seeds a device heartbeat (tests).
    pub async fn insert_device(&self, device: Device) {
        self.inner
            .write()
            .await
            .devices
            .insert((device.license_id, device.identifier.clone()), device);
    }

    /// Returns a device heartbeat, if present (tests).
    pub async fn device(&self, license_id: LicenseId, identifier: &str) -> Option<Device> {
        self.inner
            .read()
            .await
            .devices
            .get(&(license_id, identifier.to_string()))
            .cloned()
    }

    /// Returns a license by id (tests).
    pub async fn license(&self, id: LicenseId) -> Option<License> {
        self.inner.read().await.licenses.get(&id).cloned()
    }

    /// Returns a release by id (tests).
    pub async fn release(&self, id: ReleaseId) -> Option<Release> {
        self.inner.read().await.releases.get(&id).cloned()
    }

    /// Returns the hit counter of a blacklist entry (tests).
    pub async fn blacklist_hits(
        &self,
        team_id: TeamId,
        ty: BlacklistType,
        value: &str,
    ) -> Option<u64> {
        let inner = self.inner.read().await;
        inner.teams.get(&team_id).and_then(|team| {
            team.blacklist
                .iter()
                .find(|e| e.ty == ty && e.value == value)
                .map(|e| e.hits)
        })
    }

    /// Returns all request-log rows (tests).
    pub async fn request_logs(&self) -> Vec<RequestLog> {
        self.inner.read().await.request_logs.clone()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn team(&self, id: TeamId) -> StoreResult<Option<Team>> {
        let inner = self.inner.read().await;
        Ok(inner.teams.get(&id).filter(|t| !t.is_deleted()).cloned())
    }

    async fn license_by_hash(
        &self,
        team_id: TeamId,
        key_hash: &str,
    ) -> StoreResult<Option<License>> {
        let inner = self.inner.read().await;
        Ok(inner
            .licenses
            .values()
            .find(|l| l.team_id == team_id && l.key_hash == key_hash)
            .cloned())
    }

    async fn customers(&self, ids: &[CustomerId]) -> StoreResult<Vec<Customer>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.customers.get(id).cloned())
            .collect())
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn releases_of(&self, product_id: ProductId) -> StoreResult<Vec<Release>> {
        let inner = self.inner.read().await;
        Ok(inner
            .releases
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn devices_of(&self, license_id: LicenseId) -> StoreResult<Vec<Device>> {
        let inner = self.inner.read().await;
        Ok(inner
            .devices
            .values()
            .filter(|d| d.license_id == license_id)
            .cloned()
            .collect())
    }

    async fn distinct_ips_since(
        &self,
        license_id: LicenseId,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut ips: Vec<String> = inner
            .request_logs
            .iter()
            .filter(|log| log.license_id == Some(license_id) && log.created_at >= cutoff)
            .filter_map(|log| log.ip.clone())
            .collect();
        ips.sort();
        ips.dedup();
        Ok(ips)
    }

    async fn commit_expiration(
        &self,
        license_id: LicenseId,
        date: DateTime<Utc>,
    ) -> StoreResult<DateTime<Utc>> {
        let mut inner = self.inner.write().await;
        let license = inner
            .licenses
            .get_mut(&license_id)
            .ok_or_else(|| StoreError::Inconsistent(format!("license {license_id} vanished")))?;
        // Set-if-null: a committed date is never overwritten.
        match license.expiration_date {
            Some(existing) => Ok(existing),
            None => {
                license.expiration_date = Some(date);
                Ok(date)
            }
        }
    }

    async fn record_delivery(
        &self,
        device: Device,
        release_id: ReleaseId,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .devices
            .insert((device.license_id, device.identifier.clone()), device);
        if let Some(release) = inner.releases.get_mut(&release_id) {
            release.last_download_at = Some(at);
        }
        Ok(())
    }

    async fn increment_blacklist_hit(
        &self,
        team_id: TeamId,
        ty: BlacklistType,
        value: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let team = inner
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| StoreError::Inconsistent(format!("team {team_id} vanished")))?;
        if let Some(entry) = team
            .blacklist
            .iter_mut()
            .find(|e| e.ty == ty && e.value == value)
        {
            entry.hits += 1;
        }
        Ok(())
    }

    async fn append_request_log(&self, entry: RequestLog) -> StoreResult<()> {
        self.inner.write().await.request_logs.push(entry);
        Ok(())
    }
}
