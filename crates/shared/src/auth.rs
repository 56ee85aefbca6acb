//! Authentication payloads and access token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens.
///
/// Access tokens are bound to a specific session and device so that
/// request-time validation can cross-check the token against the
/// persisted session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// User's role.
    pub role: String,
    /// Session ID the token is bound to.
    pub sid: Uuid,
    /// Device ID the token is bound to.
    pub did: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user session.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        role: &str,
        session_id: Uuid,
        device_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role: role.to_string(),
            sid: session_id,
            did: device_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the session ID from claims.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.sid
    }

    /// Returns the device ID from claims.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.did
    }
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// User email.
    pub email: String,
    /// User password.
    pub password: String,
    /// Client-computed device fingerprint, if available.
    pub device_fingerprint: Option<String>,
    /// Client platform description (e.g. "android", "web").
    pub platform: Option<String>,
    /// Coarse location label reported by the client.
    pub location: Option<String>,
}

/// Login response payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Authenticated user info.
    pub user: UserInfo,
    /// Access token for API clients.
    pub access_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
    /// Device ID the session is bound to.
    pub device_id: String,
    /// Device evicted by this login, when the single-device policy
    /// forced a takeover.
    pub previous_device_id: Option<String>,
    /// Human-readable outcome message.
    pub message: String,
}

/// User info returned in auth responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: Uuid,
    /// User email.
    pub email: String,
    /// User full name.
    pub full_name: String,
    /// User's role.
    pub role: String,
}

/// Refresh response payload.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    /// New access token.
    pub access_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
}

/// Request-time session validation result.
///
/// This shape is total: every failure path produces the same structure
/// with `is_valid = false` and zeroed fields, so clients never have to
/// special-case errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionValidation {
    /// User ID, nil when invalid.
    pub user_id: Uuid,
    /// User's role, empty when invalid.
    pub role: String,
    /// Device ID, empty when invalid.
    pub device_id: String,
    /// Session ID, nil when invalid.
    pub session_id: Uuid,
    /// Session creation timestamp, epoch zero when invalid.
    pub issued_at: i64,
    /// Session expiry timestamp, epoch zero when invalid.
    pub expires_at: i64,
    /// Whether the session is valid.
    pub is_valid: bool,
    /// Whether the presented device matches the session's device.
    pub device_valid: bool,
}

impl SessionValidation {
    /// The negative result, returned on every failure path.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            user_id: Uuid::nil(),
            role: String::new(),
            device_id: String::new(),
            session_id: Uuid::nil(),
            issued_at: 0,
            expires_at: 0,
            is_valid: false,
            device_valid: false,
        }
    }
}

impl Default for SessionValidation {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Device registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDeviceRequest {
    /// Client platform description.
    pub platform: Option<String>,
    /// Coarse location label.
    pub location: Option<String>,
}

/// Device registration response.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterDeviceResponse {
    /// Newly registered device ID.
    pub device_id: String,
    /// Device evicted by this registration, if any.
    pub previous_device_id: Option<String>,
    /// Human-readable outcome message.
    pub message: String,
}

/// Device info returned in device listings.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Device ID.
    pub id: String,
    /// Client platform description.
    pub platform: Option<String>,
    /// Whether the device is currently active.
    pub is_active: bool,
    /// First time the device was seen.
    pub first_used: DateTime<Utc>,
    /// Last time the device was seen.
    pub last_active: DateTime<Utc>,
}

/// Force logout request.
#[derive(Debug, Clone, Deserialize)]
pub struct ForceLogoutRequest {
    /// Reason recorded in the action log.
    pub reason: String,
}

/// Conflict resolution request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveConflictRequest {
    /// Notes recorded on the conflict.
    pub resolution_notes: String,
}

/// Device conflict info returned to admins.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictInfo {
    /// Conflict ID.
    pub id: Uuid,
    /// Affected user.
    pub user_id: Uuid,
    /// The device that took over.
    pub new_device_id: String,
    /// The devices that were evicted.
    pub old_device_ids: Vec<String>,
    /// Role the policy applied to.
    pub role: String,
    /// When the takeover happened.
    pub occurred_at: DateTime<Utc>,
    /// Whether an admin has acknowledged the conflict.
    pub resolved: bool,
    /// Admin notes, when resolved.
    pub resolution_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_accessors() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "technician", session_id, "dev-1", Utc::now());

        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.session_id(), session_id);
        assert_eq!(claims.device_id(), "dev-1");
        assert_eq!(claims.role, "technician");
    }

    #[test]
    fn test_session_validation_invalid_is_zeroed() {
        let v = SessionValidation::invalid();
        assert!(!v.is_valid);
        assert!(!v.device_valid);
        assert!(v.user_id.is_nil());
        assert!(v.session_id.is_nil());
        assert!(v.role.is_empty());
        assert!(v.device_id.is_empty());
        assert_eq!(v.issued_at, 0);
        assert_eq!(v.expires_at, 0);
    }
}
