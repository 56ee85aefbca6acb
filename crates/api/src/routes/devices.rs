//! Device routes for registration, listing, and authorization checks.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use fieldgate_core::device::device_authorized;
use fieldgate_db::{DeviceRepository, repositories::NewDevice};
use fieldgate_shared::auth::{DeviceInfo, RegisterDeviceRequest, RegisterDeviceResponse};

use crate::AppState;
use crate::middleware::auth::CurrentUser;

/// Creates the device router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(list_devices))
        .route("/devices/register", post(register_device))
        .route("/devices/authorized", get(check_authorized))
}

/// GET /devices - List the caller's devices, active and inactive.
async fn list_devices(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    let repo = DeviceRepository::new((*state.db).clone());

    match repo.find_for_user(user.user_id).await {
        Ok(devices) => {
            let infos: Vec<DeviceInfo> = devices
                .into_iter()
                .map(|d| DeviceInfo {
                    id: d.id,
                    platform: d.platform,
                    is_active: d.is_active,
                    first_used: d.first_used.with_timezone(&chrono::Utc),
                    last_active: d.last_active.with_timezone(&chrono::Utc),
                })
                .collect();
            (StatusCode::OK, Json(json!({ "devices": infos }))).into_response()
        }
        Err(e) => {
            error!(error = %e, user_id = %user.user_id, "Failed to list devices");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred listing devices"
                })),
            )
                .into_response()
        }
    }
}

/// POST /devices/register - Register a new device for the caller.
///
/// For technicians and transporters this evicts the current device and
/// its sessions; the response then carries `previous_device_id`.
async fn register_device(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(payload): Json<RegisterDeviceRequest>,
) -> impl IntoResponse {
    let repo = DeviceRepository::new((*state.db).clone());

    let agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(ToString::to_string);

    let outcome = match repo
        .register_for_user(
            user.user_id,
            user.role,
            NewDevice {
                fingerprint: None,
                user_agent: agent,
                platform: payload.platform,
                ip_address: None,
                location: payload.location,
            },
        )
        .await
    {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, user_id = %user.user_id, "Device registration failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred registering the device"
                })),
            )
                .into_response();
        }
    };

    info!(
        user_id = %user.user_id,
        device_id = %outcome.device_id,
        takeover = outcome.previous_device_id.is_some(),
        "Device registered"
    );

    let message = if outcome.previous_device_id.is_some() {
        "Device registered. Your previous device has been signed out.".to_string()
    } else {
        "Device registered.".to_string()
    };

    (
        StatusCode::OK,
        Json(RegisterDeviceResponse {
            device_id: outcome.device_id,
            previous_device_id: outcome.previous_device_id,
            message,
        }),
    )
        .into_response()
}

/// Query parameters for the authorization check.
#[derive(Debug, Deserialize)]
struct AuthorizedQuery {
    /// Device id to check.
    device_id: String,
}

/// GET /devices/authorized - Check whether a device is authorized for
/// the caller under their role's device policy.
async fn check_authorized(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AuthorizedQuery>,
) -> impl IntoResponse {
    let repo = DeviceRepository::new((*state.db).clone());

    let active_ids: Vec<String> = match repo.find_active_for_user(user.user_id).await {
        Ok(devices) => devices.into_iter().map(|d| d.id).collect(),
        Err(e) => {
            error!(error = %e, user_id = %user.user_id, "Failed to load active devices");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred checking the device"
                })),
            )
                .into_response();
        }
    };

    let authorized = device_authorized(user.role, &query.device_id, &active_ids);

    (
        StatusCode::OK,
        Json(json!({ "device_id": query.device_id, "authorized": authorized })),
    )
        .into_response()
}
