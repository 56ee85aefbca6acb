//! Request-time session status evaluation.

use chrono::{DateTime, Utc};

use super::AuthError;

/// The judged state of a persisted session at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Session is live.
    Active,
    /// Session was explicitly revoked. Takes precedence over expiry.
    Revoked,
    /// Session passed its expiry instant without being revoked.
    Expired,
}

impl SessionStatus {
    /// Judges a session projection.
    ///
    /// Revocation wins over expiry so that audit trails and client
    /// messaging reflect the explicit action rather than the clock.
    #[must_use]
    pub fn evaluate(
        revoked_at: Option<DateTime<Utc>>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        if revoked_at.is_some() {
            Self::Revoked
        } else if expires_at <= now {
            Self::Expired
        } else {
            Self::Active
        }
    }

    /// Converts a non-active status into the matching auth error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RevokedCredential` or `AuthError::ExpiredCredential`
    /// for the corresponding statuses.
    pub fn require_active(self) -> Result<(), AuthError> {
        match self {
            Self::Active => Ok(()),
            Self::Revoked => Err(AuthError::RevokedCredential),
            Self::Expired => Err(AuthError::ExpiredCredential),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_active_session() {
        let now = Utc::now();
        let status = SessionStatus::evaluate(None, now + Duration::hours(1), now);
        assert_eq!(status, SessionStatus::Active);
        assert!(status.require_active().is_ok());
    }

    #[test]
    fn test_expired_session() {
        let now = Utc::now();
        let status = SessionStatus::evaluate(None, now - Duration::seconds(1), now);
        assert_eq!(status, SessionStatus::Expired);
        assert!(matches!(
            status.require_active(),
            Err(AuthError::ExpiredCredential)
        ));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        assert_eq!(SessionStatus::evaluate(None, now, now), SessionStatus::Expired);
    }

    #[test]
    fn test_revocation_wins_over_expiry() {
        let now = Utc::now();
        let status = SessionStatus::evaluate(Some(now - Duration::hours(2)), now - Duration::hours(1), now);
        assert_eq!(status, SessionStatus::Revoked);
        assert!(matches!(
            status.require_active(),
            Err(AuthError::RevokedCredential)
        ));
    }
}
