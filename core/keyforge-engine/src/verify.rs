//! The ordered entitlement pipeline.

use crate::blacklist::{find_match, has_country_entries};
use crate::config::EngineConfig;
use crate::expiration::{evaluate_expiration, Validity};
use crate::limits::{ip_allowed, seat_allowed};
use crate::ratelimit::RateLimiter;
use crate::request::VerifyRequest;
use chrono::{Duration, Utc};
use keyforge_crypto::{lookup_hash, open_session_key_b64, ByteStream, StreamEncryptor};
use keyforge_store::{
    AuditSink, BlacklistType, BlobStore, Device, GeoLookup, Release, ReleaseStatus,
    Repository, RequestLog, StoreError, VerificationOutcome,
};
use keyforge_types::{CustomerId, LicenseId, ProductId, RejectReason, ReleaseId, TeamId};
use std::sync::Arc;

/// A granted verification: response metadata plus the encrypted byte
/// stream. The stream is lazy; dropping it stops the underlying blob read.
pub struct Delivery {
    pub file_size: u64,
    pub product_name: String,
    pub release_status: ReleaseStatus,
    pub version: String,
    /// Version of the product's latest file-bearing release, when one exists.
    pub latest_version: Option<String>,
    pub main_class: Option<String>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("file_size", &self.file_size)
            .field("product_name", &self.product_name)
            .field("release_status", &self.release_status)
            .field("version", &self.version)
            .field("latest_version", &self.latest_version)
            .field("main_class", &self.main_class)
            .finish_non_exhaustive()
    }
}

/// Identifiers resolved along the way, for the audit record. Populated as
/// far as the pipeline got, whatever the outcome.
#[derive(Default)]
struct Trace {
    team_id: Option<TeamId>,
    license_hash: Option<String>,
    license_id: Option<LicenseId>,
    customer_id: Option<CustomerId>,
    product_id: Option<ProductId>,
    release_id: Option<ReleaseId>,
}

/// The license verification engine.
///
/// Holds the injected collaborators and walks one request through the
/// ordered checks. Construct once, share via `Arc`.
pub struct Verifier {
    repo: Arc<dyn Repository>,
    blobs: Arc<dyn BlobStore>,
    geo: Arc<dyn GeoLookup>,
    audit: Arc<dyn AuditSink>,
    limiter: RateLimiter,
    config: EngineConfig,
}

impl Verifier {
    /// Creates a verifier over the given collaborators.
    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository>,
        blobs: Arc<dyn BlobStore>,
        geo: Arc<dyn GeoLookup>,
        audit: Arc<dyn AuditSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repo,
            blobs,
            geo,
            audit,
            limiter: RateLimiter::new(),
            config,
        }
    }

    /// Computes the keyed lookup hash of a raw license key under this
    /// verifier's secret. Exposed for seeding stores.
    #[must_use]
    pub fn key_hash(&self, raw_key: &str) -> String {
        lookup_hash(raw_key.trim(), &self.config.lookup_secret)
    }

    /// Runs the full verification pipeline for one request.
    ///
    /// Exactly one audit outcome is recorded and (once the team is known)
    /// exactly one request-log row appended, on every path.
    pub async fn verify(&self, req: &VerifyRequest) -> Result<Delivery, RejectReason> {
        let mut trace = Trace::default();
        let result = self.run(req, &mut trace).await;

        let detail = match &result {
            Ok(_) => "Valid".to_string(),
            Err(reason) => reason.as_str().to_string(),
        };
        let timestamp = Utc::now();
        let device_identifier = Some(req.device_identifier.clone())
            .filter(|d| !d.trim().is_empty());

        self.audit.record(&VerificationOutcome {
            timestamp,
            team: req.team_id.clone(),
            valid: result.is_ok(),
            detail: detail.clone(),
            license_hash: trace.license_hash.clone(),
            customer_id: trace.customer_id,
            product_id: trace.product_id,
            release_id: trace.release_id,
            ip: req.ip.clone(),
            device_identifier: device_identifier.clone(),
        });

        if let Some(team_id) = trace.team_id {
            let log = RequestLog {
                team_id,
                license_id: trace.license_id,
                detail,
                ip: req.ip.clone(),
                device_identifier,
                created_at: timestamp,
            };
            if let Err(err) = self.repo.append_request_log(log).await {
                tracing::error!(error = %err, "request log append failed");
            }
        }

        result
    }

    async fn run(
        &self,
        req: &VerifyRequest,
        trace: &mut Trace,
    ) -> Result<Delivery, RejectReason> {
        let rate = &self.config.rate;

        // 1-2: shape of the team id and the query payload.
        let team_id =
            TeamId::parse(req.team_id.trim()).map_err(|_| RejectReason::BadRequest)?;
        req.validate()?;
        let product_id =
            ProductId::parse(req.product_id.trim()).map_err(|_| RejectReason::BadRequest)?;

        // 3: coarse per-IP throttle.
        if let Some(ip) = &req.ip {
            if self
                .limiter
                .check(&format!("ip:{ip}"), rate.ip_max_requests, rate.ip_window)
            {
                return Err(RejectReason::RateLimited);
            }
        }

        // 4: per-(team, raw key) throttle.
        if self.limiter.check(
            &format!("key:{team_id}:{}", req.license_key),
            rate.key_max_requests,
            rate.key_window,
        ) {
            return Err(RejectReason::RateLimited);
        }

        // 5: team must exist and not be soft-deleted.
        let team = self
            .repo
            .team(team_id)
            .await
            .map_err(store_failure)?
            .ok_or(RejectReason::TeamNotFound)?;
        trace.team_id = Some(team.id);

        // 6: plan feature gate.
        if req.classloader && !team.limits.classloader_allowed {
            return Err(RejectReason::FeatureDisabled);
        }

        // 7: open the sealed session key.
        let session = open_session_key_b64(&team.keypair, &req.session_key)
            .map_err(|_| RejectReason::InvalidSessionKey)?;

        // 8: per-(team, session hash) throttle. Keyed by the hash so the
        // raw session key never enters the limiter map. Trimmed to match
        // what open_session_key_b64 decodes, so padding a replayed blob
        // with whitespace does not open a fresh bucket.
        let session_hash = lookup_hash(req.session_key.trim(), &self.config.lookup_secret);
        if self.limiter.check(
            &format!("session:{team_id}:{session_hash}"),
            rate.session_max_requests,
            rate.session_window,
        ) {
            return Err(RejectReason::RateLimited);
        }

        // 9: license by lookup hash.
        let key_hash = self.key_hash(&req.license_key);
        trace.license_hash = Some(key_hash.clone());
        let license = self
            .repo
            .license_by_hash(team_id, &key_hash)
            .await
            .map_err(store_failure)?
            .ok_or(RejectReason::LicenseNotFound)?;
        trace.license_id = Some(license.id);

        // 10: requested product must be attached to the license and the team.
        if !license.product_ids.contains(&product_id) {
            return Err(RejectReason::ProductNotFound);
        }
        let product = self
            .repo
            .product(product_id)
            .await
            .map_err(store_failure)?
            .filter(|p| p.team_id == team_id)
            .ok_or(RejectReason::ProductNotFound)?;
        trace.product_id = Some(product.id);

        // 11: resolve the target release. An explicit version never falls
        // back to latest.
        let releases = self
            .repo
            .releases_of(product_id)
            .await
            .map_err(store_failure)?;
        let release = resolve_release(&releases, req.version.as_deref())
            .ok_or(RejectReason::ReleaseNotFound)?
            .clone();
        trace.release_id = Some(release.id);

        // 12: publication status.
        match release.status {
            ReleaseStatus::Archived => return Err(RejectReason::ReleaseArchived),
            ReleaseStatus::Draft => return Err(RejectReason::ReleaseDraft),
            ReleaseStatus::Published => {}
        }

        // 13: release allow-list.
        if let Some(allowed) = &release.allowed_licenses {
            if !allowed.contains(&license.id) {
                return Err(RejectReason::ReleaseRestricted);
            }
        }

        // 14: blacklists, in order: IP, country, device identifier.
        if let Some(ip) = &req.ip {
            if find_match(&team.blacklist, BlacklistType::IpAddress, ip).is_some() {
                self.bump_blacklist(team_id, BlacklistType::IpAddress, ip).await;
                return Err(RejectReason::IpBlacklisted);
            }
        }
        let mut country = None;
        if has_country_entries(&team.blacklist) {
            // Geolocation is only consulted when a country entry exists.
            if let Some(visitor) = req.ip.as_deref().and_then(|ip| self.geo.resolve(ip)) {
                if find_match(&team.blacklist, BlacklistType::Country, &visitor.alpha2)
                    .is_some()
                {
                    self.bump_blacklist(team_id, BlacklistType::Country, &visitor.alpha2)
                        .await;
                    return Err(RejectReason::CountryBlacklisted);
                }
                country = Some(visitor.alpha2);
            }
        }
        if find_match(
            &team.blacklist,
            BlacklistType::DeviceIdentifier,
            &req.device_identifier,
        )
        .is_some()
        {
            self.bump_blacklist(
                team_id,
                BlacklistType::DeviceIdentifier,
                &req.device_identifier,
            )
            .await;
            return Err(RejectReason::DeviceBlacklisted);
        }

        // 15: customer-matching policy.
        if !license.customer_ids.is_empty() {
            let supplied = req
                .customer_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            match supplied {
                None if team.settings.strict_customers => {
                    return Err(RejectReason::CustomerNotFound);
                }
                None => {}
                Some(raw) => {
                    let wanted =
                        CustomerId::parse(raw).map_err(|_| RejectReason::CustomerNotFound)?;
                    let known = self
                        .repo
                        .customers(&license.customer_ids)
                        .await
                        .map_err(store_failure)?;
                    let matched = known
                        .iter()
                        .find(|c| c.id == wanted)
                        .ok_or(RejectReason::CustomerNotFound)?;
                    trace.customer_id = Some(matched.id);
                }
            }
        }

        // 16: suspension.
        if license.suspended {
            return Err(RejectReason::LicenseSuspended);
        }

        // 17: expiration. An uncommitted Duration license is only evaluated
        // here; the date is persisted at step 20, so a request rejected by a
        // later check never starts the license clock.
        let now = Utc::now();
        let mut pending_expiration = None;
        match evaluate_expiration(&license, now) {
            Validity::Valid => {}
            Validity::Expired => return Err(RejectReason::LicenseExpired),
            Validity::NeedsCommit(date) => {
                // A Creation-anchored license can be born expired.
                if now > date {
                    return Err(RejectReason::LicenseExpired);
                }
                pending_expiration = Some(date);
            }
        }

        // 18: IP cap over the team's window.
        if let (Some(cap), Some(ip)) = (license.max_ip_addresses, &req.ip) {
            let cutoff = now - Duration::seconds(team.settings.ip_limit_window_secs as i64);
            let known = self
                .repo
                .distinct_ips_since(license.id, cutoff)
                .await
                .map_err(store_failure)?;
            if !ip_allowed(&known, ip, cap) {
                return Err(RejectReason::MaximumIpAddresses);
            }
        }

        // 19: seat cap against active heartbeats.
        if let Some(cap) = license.max_seats {
            let devices = self.repo.devices_of(license.id).await.map_err(store_failure)?;
            if !seat_allowed(
                &devices,
                &req.device_identifier,
                now,
                team.settings.device_timeout_secs,
                cap,
            ) {
                return Err(RejectReason::MaximumConcurrentSeats);
            }
        }

        // 20: fetch the blob, commit the expiration date if due, record the
        // delivery, wrap the stream for the session. The blob comes first so
        // the last possible rejection writes nothing. resolve_release only
        // returns file-bearing releases.
        let file = release.file.as_ref().ok_or(RejectReason::ReleaseNotFound)?;
        let source = self
            .blobs
            .get(&self.config.bucket, &file.object_key)
            .await
            .map_err(store_failure)?
            // Store and database can drift; a missing object is still a 404.
            .ok_or(RejectReason::ReleaseNotFound)?;

        if let Some(date) = pending_expiration {
            let committed = self
                .repo
                .commit_expiration(license.id, date)
                .await
                .map_err(store_failure)?;
            // A concurrent request may have won the commit; its date is
            // authoritative.
            if now > committed {
                return Err(RejectReason::LicenseExpired);
            }
        }

        let device = Device {
            license_id: license.id,
            identifier: req.device_identifier.clone(),
            last_seen: now,
            last_ip: req.ip.clone(),
            last_country: country,
        };
        self.repo
            .record_delivery(device, release.id, now)
            .await
            .map_err(store_failure)?;

        let stream = StreamEncryptor::new(&session).encrypt_stream(source);

        let latest_version = releases
            .iter()
            .find(|r| r.latest && r.has_file())
            .map(|r| r.version.clone());

        Ok(Delivery {
            file_size: file.size,
            product_name: product.name,
            release_status: release.status,
            version: release.version.clone(),
            latest_version,
            main_class: file.main_class.clone(),
            stream,
        })
    }

    /// Increments a blacklist entry's hit counter; failures are logged and
    /// swallowed so the rejection still goes out.
    async fn bump_blacklist(&self, team_id: TeamId, ty: BlacklistType, value: &str) {
        if let Err(err) = self.repo.increment_blacklist_hit(team_id, ty, value).await {
            tracing::warn!(error = %err, "blacklist hit increment failed");
        }
    }
}

fn resolve_release<'a>(releases: &'a [Release], version: Option<&str>) -> Option<&'a Release> {
    let mut candidates = releases.iter().filter(|r| r.has_file());
    match version {
        Some(v) => candidates.find(|r| r.version == v),
        None => candidates.find(|r| r.latest),
    }
}

fn store_failure(err: StoreError) -> RejectReason {
    tracing::error!(error = %err, "store failure during verification");
    RejectReason::InternalError
}
