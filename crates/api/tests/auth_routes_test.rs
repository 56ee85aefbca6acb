//! Router-level tests for logout idempotency and validator totality.
//!
//! These use SeaORM's mock backend, so every database outcome -
//! including outages - can be scripted without Postgres.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
use tower::ServiceExt;
use uuid::Uuid;

use fieldgate_api::{AppState, create_router};
use fieldgate_db::entities::user_sessions;
use fieldgate_shared::auth::SessionValidation;
use fieldgate_shared::{JwtConfig, JwtService};

fn test_state(db: sea_orm::DatabaseConnection) -> AppState {
    AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(JwtService::new(JwtConfig {
            secret: "router-test-secret".to_string(),
            access_token_expires_minutes: 15,
        })),
        cookie_secure: false,
    }
}

fn session_row(
    session_id: Uuid,
    expires_at: chrono::DateTime<chrono::Utc>,
    revoked: bool,
) -> user_sessions::Model {
    session_row_with_chain(session_id, expires_at, revoked, chrono::Utc::now())
}

fn session_row_with_chain(
    session_id: Uuid,
    expires_at: chrono::DateTime<chrono::Utc>,
    revoked: bool,
    chain_started_at: chrono::DateTime<chrono::Utc>,
) -> user_sessions::Model {
    let now = chrono::Utc::now();
    user_sessions::Model {
        id: session_id,
        user_id: Uuid::new_v4(),
        role: "technician".to_string(),
        device_id: "dev_router_test".to_string(),
        ip_address: None,
        user_agent: None,
        refresh_token_hash: "hash".to_string(),
        expires_at: expires_at.into(),
        chain_started_at: chain_started_at.into(),
        rotated_from: None,
        revoked_at: revoked.then(|| now.into()),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

async fn read_validation(response: axum::response::Response) -> SessionValidation {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response must be the fixed validation shape")
}

fn clears_cookie(response: &axum::response::Response, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{name}=")) && v.contains("Max-Age=0"))
}

#[tokio::test]
async fn test_logout_without_cookies_succeeds() {
    // No expectations scripted: logout without a cookie must not touch
    // the database at all.
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(clears_cookie(&response, "fg_session"));
    assert!(clears_cookie(&response, "fg_refresh"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], serde_json::json!(true));
}

#[tokio::test]
async fn test_logout_clears_cookies_even_when_revocation_fails() {
    // Script failures on both queues: the revocation fails however the
    // backend maps the UPDATE.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors(vec![DbErr::Custom("connection lost".to_string())])
        .append_exec_errors(vec![DbErr::Custom("connection lost".to_string())])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/logout")
                .header(header::COOKIE, format!("fg_session={}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(clears_cookie(&response, "fg_session"));
    assert!(clears_cookie(&response, "fg_refresh"));
}

#[tokio::test]
async fn test_validator_with_no_credential() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let validation = read_validation(response).await;
    assert!(!validation.is_valid);
    assert!(validation.user_id.is_nil());
}

#[tokio::test]
async fn test_validator_with_garbage_bearer_token() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let validation = read_validation(response).await;
    assert!(!validation.is_valid);
    assert!(!validation.device_valid);
}

#[tokio::test]
async fn test_validator_with_malformed_session_cookie() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .header(header::COOKIE, "fg_session=not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(clears_cookie(&response, "fg_session"));
    let validation = read_validation(response).await;
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn test_validator_clears_cookies_for_expired_session() {
    let session_id = Uuid::new_v4();
    let expired = chrono::Utc::now() - chrono::Duration::seconds(1);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![session_row(session_id, expired, false)]])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .header(header::COOKIE, format!("fg_session={session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(clears_cookie(&response, "fg_session"));
    assert!(clears_cookie(&response, "fg_refresh"));
    let validation = read_validation(response).await;
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn test_validator_survives_database_outage() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors(vec![DbErr::Custom("connection lost".to_string())])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .header(header::COOKIE, format!("fg_session={}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // A backend outage is not a dead credential: 200, negative shape,
    // cookies untouched.
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!clears_cookie(&response, "fg_session"));
    let validation = read_validation(response).await;
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn test_validator_accepts_live_session_cookie() {
    let session_id = Uuid::new_v4();
    let expires = chrono::Utc::now() + chrono::Duration::hours(5);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![session_row(session_id, expires, false)]])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .header(header::COOKIE, format!("fg_session={session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let validation = read_validation(response).await;
    assert!(validation.is_valid);
    assert!(validation.device_valid);
    assert_eq!(validation.session_id, session_id);
    assert_eq!(validation.role, "technician");
    assert_eq!(validation.device_id, "dev_router_test");
}

#[tokio::test]
async fn test_validator_rejects_device_mismatch_on_bearer_path() {
    let session_id = Uuid::new_v4();
    let expires = chrono::Utc::now() + chrono::Duration::hours(5);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![session_row(session_id, expires, false)]])
        .into_connection();
    let state = test_state(db);

    // Token claims a different device than the session row is bound to.
    let token = state
        .jwt_service
        .generate_access_token(Uuid::new_v4(), "technician", session_id, "dev_other")
        .unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/session")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let validation = read_validation(response).await;
    assert!(!validation.is_valid);
    assert!(!validation.device_valid);
}

#[tokio::test]
async fn test_protected_route_requires_credential() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/devices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_past_chain_window_expires_even_with_live_session() {
    // The latest session is itself still valid, but the chain started
    // eight days ago: the refresh must die on the chain bound.
    let session_id = Uuid::new_v4();
    let expires = chrono::Utc::now() + chrono::Duration::hours(20);
    let chain_started = chrono::Utc::now() - chrono::Duration::days(8);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![session_row_with_chain(
            session_id,
            expires,
            false,
            chain_started,
        )]])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .header(header::COOKIE, "fg_refresh=some-opaque-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(clears_cookie(&response, "fg_session"));
    assert!(clears_cookie(&response, "fg_refresh"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], serde_json::json!("token_expired"));
}

#[tokio::test]
async fn test_refresh_replay_is_rejected_and_clears_cookies() {
    // The parent is found, but the conditional revoke matches zero rows:
    // a concurrent rotation already consumed this token.
    let session_id = Uuid::new_v4();
    let expires = chrono::Utc::now() + chrono::Duration::hours(5);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![session_row(session_id, expires, false)]])
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .header(header::COOKIE, "fg_refresh=replayed-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(clears_cookie(&response, "fg_session"));
    assert!(clears_cookie(&response, "fg_refresh"));
}

#[tokio::test]
async fn test_refresh_rotates_and_reissues_cookies() {
    let parent_id = Uuid::new_v4();
    let child_id = Uuid::new_v4();
    let expires = chrono::Utc::now() + chrono::Duration::hours(5);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // find_by_token, then the child insert's RETURNING row.
        .append_query_results(vec![
            vec![session_row(parent_id, expires, false)],
            vec![session_row(child_id, expires, false)],
        ])
        // The conditional revoke of the parent hits exactly one row.
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .header(header::COOKIE, "fg_refresh=live-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let reissued = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("fg_session={child_id}")));
    assert!(reissued, "session cookie must point at the child session");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_router(test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
