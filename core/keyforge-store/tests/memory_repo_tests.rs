use chrono::{Duration, Utc};
use keyforge_crypto::TeamKeypair;
use keyforge_store::{
    BlacklistEntry, BlacklistType, Device, ExpirationAnchor, ExpirationPolicy, License,
    MemoryRepository, Release, ReleaseStatus, Repository, RequestLog, Team, TeamLimits,
    TeamSettings,
};
use keyforge_types::{LicenseId, ProductId, ReleaseId, TeamId};

fn team(blacklist: Vec<BlacklistEntry>) -> Team {
    Team {
        id: TeamId::new(),
        name: "acme".to_string(),
        deleted_at: None,
        settings: TeamSettings::default(),
        limits: TeamLimits::default(),
        keypair: TeamKeypair::generate(),
        blacklist,
    }
}

fn license(team_id: TeamId, key_hash: &str) -> License {
    License {
        id: LicenseId::new(),
        team_id,
        key_hash: key_hash.to_string(),
        suspended: false,
        expiration: ExpirationPolicy::Never,
        expiration_date: None,
        expiration_anchor: ExpirationAnchor::Activation,
        max_ip_addresses: None,
        max_seats: None,
        customer_ids: vec![],
        product_ids: vec![],
        created_at: Utc::now(),
    }
}

fn release(product_id: ProductId) -> Release {
    let now = Utc::now();
    Release {
        id: ReleaseId::new(),
        product_id,
        status: ReleaseStatus::Published,
        version: "1.0.0".to_string(),
        latest: true,
        allowed_licenses: None,
        file: None,
        created_at: now,
        updated_at: now,
        last_download_at: None,
    }
}

// ── Team lookup ─────────────────────────────────────────────────

#[tokio::test]
async fn soft_deleted_team_resolves_as_absent() {
    let repo = MemoryRepository::new();
    let mut t = team(vec![]);
    t.deleted_at = Some(Utc::now());
    let id = t.id;
    repo.insert_team(t).await;

    assert!(repo.team(id).await.unwrap().is_none());
}

#[tokio::test]
async fn live_team_resolves() {
    let repo = MemoryRepository::new();
    let t = team(vec![]);
    let id = t.id;
    repo.insert_team(t).await;

    assert!(repo.team(id).await.unwrap().is_some());
}

// ── License lookup by hash ──────────────────────────────────────

#[tokio::test]
async fn license_lookup_is_team_scoped() {
    let repo = MemoryRepository::new();
    let t1 = team(vec![]);
    let t2 = team(vec![]);
    let (id1, id2) = (t1.id, t2.id);
    repo.insert_team(t1).await;
    repo.insert_team(t2).await;
    repo.insert_license(license(id1, "abc123")).await;

    assert!(repo.license_by_hash(id1, "abc123").await.unwrap().is_some());
    assert!(repo.license_by_hash(id2, "abc123").await.unwrap().is_none());
    assert!(repo.license_by_hash(id1, "zzz999").await.unwrap().is_none());
}

// ── Expiration commit ───────────────────────────────────────────

#[tokio::test]
async fn commit_expiration_sets_when_null() {
    let repo = MemoryRepository::new();
    let lic = license(TeamId::new(), "h");
    let lic_id = lic.id;
    repo.insert_license(lic).await;

    let date = Utc::now() + Duration::days(30);
    let committed = repo.commit_expiration(lic_id, date).await.unwrap();
    assert_eq!(committed, date);
    assert_eq!(repo.license(lic_id).await.unwrap().expiration_date, Some(date));
}

#[tokio::test]
async fn commit_expiration_never_overwrites() {
    let repo = MemoryRepository::new();
    let lic = license(TeamId::new(), "h");
    let lic_id = lic.id;
    repo.insert_license(lic).await;

    let first = Utc::now() + Duration::days(30);
    repo.commit_expiration(lic_id, first).await.unwrap();

    // Replays with a later date return the original, unchanged.
    for extra in 1..=5 {
        let replay = first + Duration::days(extra);
        let committed = repo.commit_expiration(lic_id, replay).await.unwrap();
        assert_eq!(committed, first);
    }
    assert_eq!(
        repo.license(lic_id).await.unwrap().expiration_date,
        Some(first)
    );
}

// ── Delivery recording ──────────────────────────────────────────

#[tokio::test]
async fn record_delivery_upserts_heartbeat_and_touches_release() {
    let repo = MemoryRepository::new();
    let lic_id = LicenseId::new();
    let rel = release(ProductId::new());
    let rel_id = rel.id;
    repo.insert_release(rel).await;

    let t0 = Utc::now();
    let device = Device {
        license_id: lic_id,
        identifier: "device-a".to_string(),
        last_seen: t0,
        last_ip: Some("1.2.3.4".to_string()),
        last_country: None,
    };
    repo.record_delivery(device, rel_id, t0).await.unwrap();

    let stored = repo.device(lic_id, "device-a").await.unwrap();
    assert_eq!(stored.last_ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(repo.release(rel_id).await.unwrap().last_download_at, Some(t0));

    // Last writer wins on the heartbeat.
    let t1 = t0 + Duration::seconds(90);
    let newer = Device {
        license_id: lic_id,
        identifier: "device-a".to_string(),
        last_seen: t1,
        last_ip: Some("5.6.7.8".to_string()),
        last_country: Some("DE".to_string()),
    };
    repo.record_delivery(newer, rel_id, t1).await.unwrap();

    let stored = repo.device(lic_id, "device-a").await.unwrap();
    assert_eq!(stored.last_seen, t1);
    assert_eq!(stored.last_ip.as_deref(), Some("5.6.7.8"));
    assert_eq!(repo.devices_of(lic_id).await.unwrap().len(), 1);
}

// ── Blacklist hit counters ──────────────────────────────────────

#[tokio::test]
async fn blacklist_hits_increment_by_one() {
    let repo = MemoryRepository::new();
    let t = team(vec![BlacklistEntry::new(BlacklistType::IpAddress, "1.2.3.4")]);
    let team_id = t.id;
    repo.insert_team(t).await;

    for expected in 1..=3u64 {
        repo.increment_blacklist_hit(team_id, BlacklistType::IpAddress, "1.2.3.4")
            .await
            .unwrap();
        assert_eq!(
            repo.blacklist_hits(team_id, BlacklistType::IpAddress, "1.2.3.4")
                .await,
            Some(expected)
        );
    }
}

// ── IP history window ───────────────────────────────────────────

#[tokio::test]
async fn distinct_ips_respects_cutoff_and_dedupes() {
    let repo = MemoryRepository::new();
    let team_id = TeamId::new();
    let lic_id = LicenseId::new();
    let now = Utc::now();

    let log = |ip: Option<&str>, age_secs: i64| RequestLog {
        team_id,
        license_id: Some(lic_id),
        detail: "Valid".to_string(),
        ip: ip.map(str::to_string),
        device_identifier: None,
        created_at: now - Duration::seconds(age_secs),
    };

    repo.append_request_log(log(Some("1.1.1.1"), 10)).await.unwrap();
    repo.append_request_log(log(Some("1.1.1.1"), 20)).await.unwrap();
    repo.append_request_log(log(Some("2.2.2.2"), 30)).await.unwrap();
    repo.append_request_log(log(None, 5)).await.unwrap();
    repo.append_request_log(log(Some("3.3.3.3"), 5000)).await.unwrap();

    let ips = repo
        .distinct_ips_since(lic_id, now - Duration::seconds(3600))
        .await
        .unwrap();
    assert_eq!(ips, vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()]);
}

#[tokio::test]
async fn distinct_ips_is_license_scoped() {
    let repo = MemoryRepository::new();
    let team_id = TeamId::new();
    let (lic_a, lic_b) = (LicenseId::new(), LicenseId::new());
    let now = Utc::now();

    repo.append_request_log(RequestLog {
        team_id,
        license_id: Some(lic_a),
        detail: "Valid".to_string(),
        ip: Some("9.9.9.9".to_string()),
        device_identifier: None,
        created_at: now,
    })
    .await
    .unwrap();

    let ips = repo
        .distinct_ips_since(lic_b, now - Duration::seconds(60))
        .await
        .unwrap();
    assert!(ips.is_empty());
}
