//! Authentication routes for login, refresh, logout, and session validation.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use fieldgate_core::auth::{UserRole, verify_password};
use fieldgate_core::session::{SessionPolicy, SessionStatus};
use fieldgate_db::{
    DeviceRepository, SessionRepository, UserRepository,
    entities::user_sessions,
    repositories::{NewDevice, RegistrationOutcome, SessionStoreError},
};
use fieldgate_shared::auth::{
    LoginRequest, LoginResponse, RefreshResponse, SessionValidation, UserInfo,
};

use crate::AppState;
use crate::cookies::{REFRESH_COOKIE, SESSION_COOKIE, clear_session_cookies, set_session_cookies};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
}

/// Reads the client IP from forwarding headers.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
}

/// Reads the client user agent.
fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(ToString::to_string)
}

fn internal_error(message: &'static str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": message
        })),
    )
        .into_response()
}

/// POST /auth/login - Authenticate user, bind a device, open a session.
#[allow(clippy::too_many_lines)]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let user_repo = UserRepository::new((*state.db).clone());

    // Find user by email
    let user = match user_repo.find_by_email(&payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!(email = %payload.email, "Login attempt for non-existent user");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_credentials",
                    "message": "Invalid email or password"
                })),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Database error during login");
            return internal_error("An error occurred during login");
        }
    };

    if !user.is_active {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "account_disabled",
                "message": "This account has been disabled"
            })),
        )
            .into_response();
    }

    // Verify password
    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "Failed login attempt - invalid password");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_credentials",
                    "message": "Invalid email or password"
                })),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Password verification error");
            return internal_error("An error occurred during login");
        }
    }

    let Ok(role) = user.role.parse::<UserRole>() else {
        error!(user_id = %user.id, role = %user.role, "User row carries an unknown role");
        return internal_error("An error occurred during login");
    };

    let ip_address = client_ip(&headers);
    let agent = user_agent(&headers);

    // Bind the device. A presented fingerprint is reused only when it is
    // this user's own active device; fingerprints are client-supplied,
    // so another user's device row is never adopted.
    let device_repo = DeviceRepository::new((*state.db).clone());
    let outcome = match resolve_device(&device_repo, &user.id, role, &payload, ip_address.as_deref(), agent.as_deref()).await {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "Device registration failed during login");
            return internal_error("An error occurred during login");
        }
    };

    // Open the session bound to the device
    let session_repo = SessionRepository::new((*state.db).clone());
    let (session_row, refresh_token) = match session_repo
        .create(
            user.id,
            role,
            &outcome.device_id,
            ip_address.as_deref(),
            agent.as_deref(),
        )
        .await
    {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "Failed to persist session");
            return internal_error("An error occurred during login");
        }
    };

    let access_token = match state.jwt_service.generate_access_token(
        user.id,
        &user.role,
        session_row.id,
        &outcome.device_id,
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to generate access token");
            return internal_error("An error occurred during login");
        }
    };

    info!(
        user_id = %user.id,
        device_id = %outcome.device_id,
        takeover = outcome.previous_device_id.is_some(),
        "User logged in successfully"
    );

    let message = if outcome.previous_device_id.is_some() {
        "Signed in. Your previous device has been signed out.".to_string()
    } else {
        "Signed in.".to_string()
    };

    let jar = set_session_cookies(
        jar,
        session_row.id,
        role.session_ttl(),
        &refresh_token,
        state.cookie_secure,
    );

    let response = LoginResponse {
        user: UserInfo {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        },
        access_token,
        expires_in: state.jwt_service.access_token_expires_in(),
        device_id: outcome.device_id,
        previous_device_id: outcome.previous_device_id,
        message,
    };

    (jar, (StatusCode::OK, Json(response))).into_response()
}

/// Reuses the caller's own active device or registers a new one.
async fn resolve_device(
    device_repo: &DeviceRepository,
    user_id: &Uuid,
    role: UserRole,
    payload: &LoginRequest,
    ip_address: Option<&str>,
    agent: Option<&str>,
) -> Result<RegistrationOutcome, sea_orm::DbErr> {
    let mut fingerprint = payload.device_fingerprint.clone();

    if let Some(fp) = payload.device_fingerprint.as_deref() {
        match device_repo.find_by_id(fp).await? {
            Some(d) if d.user_id == *user_id && d.is_active => {
                if let Err(e) = device_repo.touch(fp).await {
                    warn!(error = %e, device_id = %fp, "Failed to update device last_active");
                }
                return Ok(RegistrationOutcome {
                    device_id: fp.to_string(),
                    previous_device_id: None,
                    conflict_id: None,
                });
            }
            Some(d) if d.user_id != *user_id => {
                // Foreign device row; fall through with a fresh fingerprint.
                fingerprint = None;
            }
            _ => {}
        }
    }

    device_repo
        .register_for_user(
            *user_id,
            role,
            NewDevice {
                fingerprint,
                user_agent: agent.map(ToString::to_string),
                platform: payload.platform.clone(),
                ip_address: ip_address.map(ToString::to_string),
                location: payload.location.clone(),
            },
        )
        .await
}

/// POST /auth/refresh - Rotate the session using the refresh cookie.
async fn refresh(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let Some(cookie) = jar.get(REFRESH_COOKIE) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "No refresh token"
            })),
        )
            .into_response();
    };
    let refresh_token = cookie.value().to_string();

    let session_repo = SessionRepository::new((*state.db).clone());

    let parent = match session_repo.find_by_token(&refresh_token).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return (
                clear_session_cookies(jar),
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "invalid_token",
                        "message": "Invalid refresh token"
                    })),
                ),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Database error during refresh");
            return internal_error("An error occurred during token refresh");
        }
    };

    // The chain bound is measured from the first session in the chain,
    // not from the latest session's own expiry.
    let chain_started = parent.chain_started_at.with_timezone(&chrono::Utc);
    if !SessionPolicy::chain_alive(chain_started, chrono::Utc::now()) {
        return (
            clear_session_cookies(jar),
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "token_expired",
                    "message": "Refresh token expired"
                })),
            ),
        )
            .into_response();
    }

    let (child, new_refresh_token) = match session_repo.rotate(&parent).await {
        Ok(pair) => pair,
        Err(SessionStoreError::RotationConflict) => {
            warn!(session_id = %parent.id, "Refresh token replay detected");
            return (
                clear_session_cookies(jar),
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "invalid_token",
                        "message": "Invalid refresh token"
                    })),
                ),
            )
                .into_response();
        }
        Err(SessionStoreError::Database(e)) => {
            error!(error = %e, "Database error during rotation");
            return internal_error("An error occurred during token refresh");
        }
    };

    let role = child.role.parse::<UserRole>().unwrap_or(UserRole::Customer);
    let access_token = match state.jwt_service.generate_access_token(
        child.user_id,
        &child.role,
        child.id,
        &child.device_id,
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to generate access token");
            return internal_error("An error occurred during token refresh");
        }
    };

    info!(user_id = %child.user_id, parent = %parent.id, child = %child.id, "Session rotated");

    let jar = set_session_cookies(
        jar,
        child.id,
        role.session_ttl(),
        &new_refresh_token,
        state.cookie_secure,
    );

    (
        jar,
        (
            StatusCode::OK,
            Json(RefreshResponse {
                access_token,
                expires_in: state.jwt_service.access_token_expires_in(),
            }),
        ),
    )
        .into_response()
}

/// POST /auth/logout - Revoke the current session.
///
/// Idempotent: without a session cookie it still succeeds, and the
/// cookies are cleared even when the revocation write fails, so the
/// client-visible effect of logout never depends on the backend.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Ok(session_id) = cookie.value().parse::<Uuid>()
    {
        let session_repo = SessionRepository::new((*state.db).clone());
        if let Err(e) = session_repo.revoke(session_id).await {
            warn!(error = %e, session_id = %session_id, "Failed to revoke session on logout");
        } else {
            info!(session_id = %session_id, "User logged out");
        }
    }

    (
        clear_session_cookies(jar),
        (StatusCode::OK, Json(json!({ "success": true }))),
    )
        .into_response()
}

/// GET /auth/session - Composite session validation.
///
/// Total: every failure path, including a database outage, yields the
/// same zeroed shape with `is_valid = false` and a 200, so the polling
/// client never special-cases errors. Dead cookies are cleared in
/// passing.
async fn session(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (validation, clear) = validate_request(&state, &jar, &headers).await;
    let jar = if clear { clear_session_cookies(jar) } else { jar };
    (jar, (StatusCode::OK, Json(validation)))
}

/// Resolves the request's credential into a `SessionValidation`.
///
/// Returns the validation and whether the session cookies should be
/// cleared (dead credential) - never an error.
async fn validate_request(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> (SessionValidation, bool) {
    let session_repo = SessionRepository::new((*state.db).clone());

    // Bearer path: decode, look up, check status, check device claim.
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")));

    if let Some(token) = bearer {
        let Ok(claims) = state.jwt_service.validate_token(token) else {
            return (SessionValidation::invalid(), false);
        };
        return match fetch_live_session(&session_repo, claims.session_id()).await {
            Ok(Some(session)) => {
                let device_valid = claims.device_id() == session.device_id;
                if device_valid {
                    (projection(&session, true), false)
                } else {
                    (SessionValidation::invalid(), false)
                }
            }
            Ok(None) => (SessionValidation::invalid(), false),
            Err(()) => (SessionValidation::invalid(), false),
        };
    }

    // Cookie path: the session id itself is the credential.
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return (SessionValidation::invalid(), false);
    };
    let Ok(session_id) = cookie.value().parse::<Uuid>() else {
        return (SessionValidation::invalid(), true);
    };

    match fetch_live_session(&session_repo, session_id).await {
        Ok(Some(session)) => (projection(&session, true), false),
        // Revoked, expired, or unknown: the cookie is dead.
        Ok(None) => (SessionValidation::invalid(), true),
        Err(()) => (SessionValidation::invalid(), false),
    }
}

/// Looks up a session and filters out non-active ones.
///
/// `Err(())` means the database failed; `Ok(None)` means the session is
/// missing, revoked, or expired.
async fn fetch_live_session(
    session_repo: &SessionRepository,
    session_id: Uuid,
) -> Result<Option<user_sessions::Model>, ()> {
    let session = match session_repo.find_by_id(session_id).await {
        Ok(Some(s)) => s,
        Ok(None) => return Ok(None),
        Err(e) => {
            error!(error = %e, "Database error during session validation");
            return Err(());
        }
    };

    let revoked_at = session.revoked_at.map(|t| t.with_timezone(&chrono::Utc));
    let expires_at = session.expires_at.with_timezone(&chrono::Utc);
    match SessionStatus::evaluate(revoked_at, expires_at, chrono::Utc::now()) {
        SessionStatus::Active => Ok(Some(session)),
        SessionStatus::Revoked | SessionStatus::Expired => Ok(None),
    }
}

/// Projects a live session row into the validation shape.
fn projection(session: &user_sessions::Model, device_valid: bool) -> SessionValidation {
    SessionValidation {
        user_id: session.user_id,
        role: session.role.clone(),
        device_id: session.device_id.clone(),
        session_id: session.id,
        issued_at: session.created_at.timestamp(),
        expires_at: session.expires_at.timestamp(),
        is_valid: true,
        device_valid,
    }
}
