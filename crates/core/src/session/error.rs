//! Authentication error taxonomy.

use thiserror::Error;

/// Errors that can occur during session authentication.
///
/// Every variant maps to 401 except persistence failures; the client
/// message is deliberately uniform ("please log in again") regardless of
/// variant, so the taxonomy is for logs and tests, not for disclosure.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session or refresh credential was presented.
    #[error("no credential presented")]
    MissingCredential,

    /// Credential presented but no matching live record exists.
    #[error("invalid credential")]
    InvalidCredential,

    /// Credential past its validity window.
    #[error("credential expired")]
    ExpiredCredential,

    /// Credential explicitly revoked (logout, takeover, admin action).
    #[error("credential revoked")]
    RevokedCredential,

    /// Presented device does not match the session's device.
    #[error("device mismatch")]
    DeviceMismatch,

    /// Database failure during read or write. Detail is for logs only.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential
            | Self::InvalidCredential
            | Self::ExpiredCredential
            | Self::RevokedCredential
            | Self::DeviceMismatch => 401,
            Self::Persistence(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::ExpiredCredential => "EXPIRED_CREDENTIAL",
            Self::RevokedCredential => "REVOKED_CREDENTIAL",
            Self::DeviceMismatch => "DEVICE_MISMATCH",
            Self::Persistence(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this failure should clear the client's cookies.
    ///
    /// Expired and revoked credentials are dead and the cookies carrying
    /// them should go; a transient persistence failure must not log the
    /// user out.
    #[must_use]
    pub const fn clears_cookies(&self) -> bool {
        matches!(
            self,
            Self::ExpiredCredential | Self::RevokedCredential | Self::InvalidCredential
        )
    }
}
