//! Authentication middleware for protected routes.
//!
//! Two credential paths feed the same `CurrentUser`:
//! 1. the `fg_session` cookie set at login (browser clients)
//! 2. a bearer access token bound to a session and device (API clients)
//!
//! Both end in a database session lookup and a status check, so a
//! revoked or expired session dies here no matter which credential
//! carried it.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use fieldgate_core::auth::UserRole;
use fieldgate_core::session::{AuthError, SessionStatus};
use fieldgate_db::{SessionRepository, entities::user_sessions};

use crate::AppState;
use crate::cookies::SESSION_COOKIE;

/// The authenticated principal attached to a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// User ID.
    pub user_id: Uuid,
    /// User's role.
    pub role: UserRole,
    /// Session the request rides on.
    pub session_id: Uuid,
    /// Device the session is bound to.
    pub device_id: String,
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
}

/// Resolves a request's credential to a live session.
///
/// # Errors
///
/// Returns the matching `AuthError` for every failure path; callers map
/// all of them to the same uniform 401.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
    let sessions = SessionRepository::new((*state.db).clone());
    let jar = CookieJar::from_headers(headers);

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let session_id: Uuid = cookie
            .value()
            .parse()
            .map_err(|_| AuthError::InvalidCredential)?;
        let session = lookup_session(&sessions, session_id).await?;
        return current_user(&session, None);
    }

    if let Some(token) = extract_bearer_token(headers) {
        let claims = state
            .jwt_service
            .validate_token(token)
            .map_err(|e| match e {
                fieldgate_shared::JwtError::Expired => AuthError::ExpiredCredential,
                _ => AuthError::InvalidCredential,
            })?;
        let session = lookup_session(&sessions, claims.session_id()).await?;
        return current_user(&session, Some(claims.device_id()));
    }

    Err(AuthError::MissingCredential)
}

/// Looks up a session row and requires it to be active.
async fn lookup_session(
    sessions: &SessionRepository,
    session_id: Uuid,
) -> Result<user_sessions::Model, AuthError> {
    let session = sessions
        .find_by_id(session_id)
        .await
        .map_err(|e| AuthError::Persistence(e.to_string()))?
        .ok_or(AuthError::InvalidCredential)?;

    let revoked_at = session.revoked_at.map(|t| t.with_timezone(&chrono::Utc));
    let expires_at = session.expires_at.with_timezone(&chrono::Utc);
    SessionStatus::evaluate(revoked_at, expires_at, chrono::Utc::now()).require_active()?;

    Ok(session)
}

/// Builds the `CurrentUser`, enforcing the device claim when present.
fn current_user(
    session: &user_sessions::Model,
    claimed_device: Option<&str>,
) -> Result<CurrentUser, AuthError> {
    if let Some(claimed) = claimed_device
        && claimed != session.device_id
    {
        return Err(AuthError::DeviceMismatch);
    }

    let role = session
        .role
        .parse::<UserRole>()
        .map_err(|_| AuthError::InvalidCredential)?;

    Ok(CurrentUser {
        user_id: session.user_id,
        role,
        session_id: session.id,
        device_id: session.device_id.clone(),
    })
}

/// Authentication middleware validating the session credential.
///
/// On success the `CurrentUser` is stored in request extensions for
/// handlers to extract. Every failure produces the same 401 body; the
/// reason goes to the logs, not the client.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_session(&state, request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            if let AuthError::Persistence(ref detail) = e {
                error!(error = %detail, "Database error during session validation");
            }
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Authentication required. Please log in again."
                })),
            )
                .into_response()
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}

impl CurrentUser {
    /// Requires the caller to hold at least the given role's rank.
    ///
    /// # Errors
    ///
    /// Returns a 403 response payload when the rank is insufficient.
    pub fn require_rank(
        &self,
        required: UserRole,
    ) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
        if self.role.at_least(required) {
            Ok(())
        } else {
            Err((
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "forbidden",
                    "message": "Insufficient privileges for this operation"
                })),
            ))
        }
    }
}
