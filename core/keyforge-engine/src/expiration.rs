//! The expiration state machine.
//!
//! `Never` is terminal. `Date` compares against the committed date.
//! `Duration` starts uncommitted: the first successful verification computes
//! the date from the license's anchor and commits it through the
//! repository's set-if-null operation, after which the license behaves like
//! `Date`. The date is never recomputed once committed, so replays cannot
//! extend a license's life.

use chrono::{DateTime, Duration, Utc};
use keyforge_store::{ExpirationAnchor, ExpirationPolicy, License};

/// Outcome of evaluating a license's expiration at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// The license is valid; nothing to persist.
    Valid,
    /// The license is past its expiration date.
    Expired,
    /// An uncommitted `Duration` license: the caller decides validity
    /// against this date and commits it (set-if-null) only when the request
    /// is granted.
    NeedsCommit(DateTime<Utc>),
}

/// Evaluates a license's expiration state at `now`.
#[must_use]
pub fn evaluate_expiration(license: &License, now: DateTime<Utc>) -> Validity {
    match license.expiration {
        ExpirationPolicy::Never => Validity::Valid,
        ExpirationPolicy::Date => match license.expiration_date {
            Some(date) if now > date => Validity::Expired,
            _ => Validity::Valid,
        },
        ExpirationPolicy::Duration { days } => match license.expiration_date {
            Some(date) if now > date => Validity::Expired,
            Some(_) => Validity::Valid,
            None => {
                let anchor = match license.expiration_anchor {
                    ExpirationAnchor::Creation => license.created_at,
                    ExpirationAnchor::Activation => now,
                };
                Validity::NeedsCommit(anchor + Duration::days(i64::from(days)))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyforge_types::{LicenseId, TeamId};

    fn license(expiration: ExpirationPolicy, anchor: ExpirationAnchor) -> License {
        License {
            id: LicenseId::new(),
            team_id: TeamId::new(),
            key_hash: "h".to_string(),
            suspended: false,
            expiration,
            expiration_date: None,
            expiration_anchor: anchor,
            max_ip_addresses: None,
            max_seats: None,
            customer_ids: vec![],
            product_ids: vec![],
            created_at: Utc::now() - Duration::days(100),
        }
    }

    #[test]
    fn never_is_always_valid() {
        let lic = license(ExpirationPolicy::Never, ExpirationAnchor::Creation);
        assert_eq!(evaluate_expiration(&lic, Utc::now()), Validity::Valid);
    }

    #[test]
    fn date_in_past_is_expired() {
        let mut lic = license(ExpirationPolicy::Date, ExpirationAnchor::Creation);
        lic.expiration_date = Some(Utc::now() - Duration::days(1));
        assert_eq!(evaluate_expiration(&lic, Utc::now()), Validity::Expired);
    }

    #[test]
    fn date_in_future_is_valid() {
        let mut lic = license(ExpirationPolicy::Date, ExpirationAnchor::Creation);
        lic.expiration_date = Some(Utc::now() + Duration::days(1));
        assert_eq!(evaluate_expiration(&lic, Utc::now()), Validity::Valid);
    }

    #[test]
    fn exact_expiration_instant_is_still_valid() {
        let mut lic = license(ExpirationPolicy::Date, ExpirationAnchor::Creation);
        let date = Utc::now();
        lic.expiration_date = Some(date);
        assert_eq!(evaluate_expiration(&lic, date), Validity::Valid);
    }

    #[test]
    fn uncommitted_duration_anchored_to_activation() {
        let lic = license(
            ExpirationPolicy::Duration { days: 30 },
            ExpirationAnchor::Activation,
        );
        let now = Utc::now();
        assert_eq!(
            evaluate_expiration(&lic, now),
            Validity::NeedsCommit(now + Duration::days(30))
        );
    }

    #[test]
    fn uncommitted_duration_anchored_to_creation() {
        let lic = license(
            ExpirationPolicy::Duration { days: 30 },
            ExpirationAnchor::Creation,
        );
        // created_at is 100 days back; the committed date is already past.
        let expected = lic.created_at + Duration::days(30);
        assert_eq!(
            evaluate_expiration(&lic, Utc::now()),
            Validity::NeedsCommit(expected)
        );
    }

    #[test]
    fn committed_duration_behaves_like_date() {
        let mut lic = license(
            ExpirationPolicy::Duration { days: 30 },
            ExpirationAnchor::Activation,
        );
        lic.expiration_date = Some(Utc::now() - Duration::seconds(1));
        assert_eq!(evaluate_expiration(&lic, Utc::now()), Validity::Expired);

        lic.expiration_date = Some(Utc::now() + Duration::days(5));
        assert_eq!(evaluate_expiration(&lic, Utc::now()), Validity::Valid);
    }
}
