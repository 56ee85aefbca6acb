//! Session lifetime policy.

use chrono::{DateTime, Duration, Utc};

use crate::auth::UserRole;

/// Role-scoped session lifetime rules.
///
/// Session TTLs are business policy, not deployment configuration, so
/// they live here as code rather than in the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPolicy;

impl SessionPolicy {
    /// Total lifetime of a refresh chain, measured from the creation of
    /// the first session in the chain. Rotation never extends it.
    pub const REFRESH_WINDOW_DAYS: i64 = 7;

    /// Computes the expiry instant for a new session.
    #[must_use]
    pub fn expiry_for(role: UserRole, now: DateTime<Utc>) -> DateTime<Utc> {
        now + role.session_ttl()
    }

    /// Computes the hard deadline of a refresh chain.
    #[must_use]
    pub fn refresh_deadline(chain_started_at: DateTime<Utc>) -> DateTime<Utc> {
        chain_started_at + Duration::days(Self::REFRESH_WINDOW_DAYS)
    }

    /// Whether a refresh presented at `now` is still inside the chain window.
    #[must_use]
    pub fn chain_alive(chain_started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < Self::refresh_deadline(chain_started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UserRole::Customer, 6)]
    #[case(UserRole::Technician, 6)]
    #[case(UserRole::Transporter, 6)]
    #[case(UserRole::Staff, 12)]
    #[case(UserRole::Admin, 24)]
    fn test_expiry_scaled_by_role(#[case] role: UserRole, #[case] hours: i64) {
        let now = Utc::now();
        assert_eq!(
            SessionPolicy::expiry_for(role, now) - now,
            Duration::hours(hours)
        );
    }

    #[test]
    fn test_chain_window_is_seven_days() {
        let started = Utc::now();
        assert!(SessionPolicy::chain_alive(started, started));
        assert!(SessionPolicy::chain_alive(
            started,
            started + Duration::days(6)
        ));
        assert!(!SessionPolicy::chain_alive(
            started,
            started + Duration::days(7)
        ));
        assert!(!SessionPolicy::chain_alive(
            started,
            started + Duration::days(8)
        ));
    }

    #[test]
    fn test_chain_bound_ignores_session_expiry() {
        // An admin session refreshed at day 6 expires at day 7 by role TTL,
        // but a refresh at day 8 is judged against the chain start, not the
        // latest session's own expiry.
        let started = Utc::now();
        let refreshed_at = started + Duration::days(6);
        let latest_expiry = SessionPolicy::expiry_for(UserRole::Admin, refreshed_at);
        let attempt = started + Duration::days(8);

        assert!(latest_expiry > SessionPolicy::refresh_deadline(started));
        assert!(!SessionPolicy::chain_alive(started, attempt));
    }
}
