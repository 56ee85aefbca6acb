//! Session cookie construction.
//!
//! The session/refresh cookie pair is the wire contract for browser
//! clients. Cookies are always handled through an explicit `CookieJar`
//! passed by the caller; nothing in this crate reaches into ambient
//! request state.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use fieldgate_core::session::SessionPolicy;

/// Cookie carrying the session row id.
pub const SESSION_COOKIE: &str = "fg_session";

/// Cookie carrying the raw refresh token.
pub const REFRESH_COOKIE: &str = "fg_refresh";

/// Builds the session-id cookie.
///
/// SameSite is Lax so that cross-site navigation into the app keeps the
/// user signed in.
#[must_use]
pub fn session_cookie(
    session_id: Uuid,
    ttl: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// Builds the refresh-token cookie.
///
/// SameSite is Strict: the refresh token is never needed on a cross-site
/// navigation, only by the app's own refresh call.
#[must_use]
pub fn refresh_cookie(refresh_token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, refresh_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(SessionPolicy::REFRESH_WINDOW_DAYS))
        .build()
}

/// Adds the session/refresh cookie pair to the jar.
#[must_use]
pub fn set_session_cookies(
    jar: CookieJar,
    session_id: Uuid,
    ttl: chrono::Duration,
    refresh_token: &str,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(session_id, ttl, secure))
        .add(refresh_cookie(refresh_token, secure))
}

/// Removes the session/refresh cookie pair from the jar.
#[must_use]
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_COOKIE).path("/").build())
}
