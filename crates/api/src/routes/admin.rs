//! Admin routes for forced logout and conflict resolution.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use fieldgate_core::auth::UserRole;
use fieldgate_db::{
    AdminActionRepository, DeviceConflictRepository,
    entities::device_conflicts,
    repositories::ConflictError,
};
use fieldgate_shared::auth::{ConflictInfo, ForceLogoutRequest, ResolveConflictRequest};
use fieldgate_shared::types::{PageRequest, PageResponse};

use crate::AppState;
use crate::middleware::auth::CurrentUser;

/// Creates the admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/{id}/force-logout", post(force_logout))
        .route("/admin/conflicts", get(list_conflicts))
        .route("/admin/conflicts/{id}/resolve", post(resolve_conflict))
}

/// POST /admin/users/{id}/force-logout - Revoke every session and
/// deactivate every device of a user, with an attributed audit entry.
async fn force_logout(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(target_user_id): Path<Uuid>,
    Json(payload): Json<ForceLogoutRequest>,
) -> impl IntoResponse {
    if let Err(rejection) = admin.require_rank(UserRole::Admin) {
        return rejection.into_response();
    }

    if payload.reason.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "reason_required",
                "message": "A reason is required for forced logout"
            })),
        )
            .into_response();
    }

    let repo = AdminActionRepository::new((*state.db).clone());
    match repo
        .force_logout(target_user_id, admin.user_id, &payload.reason)
        .await
    {
        Ok(()) => {
            info!(
                admin_id = %admin.user_id,
                target_user_id = %target_user_id,
                "Forced logout executed"
            );
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => {
            error!(error = %e, target_user_id = %target_user_id, "Forced logout failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred during forced logout"
                })),
            )
                .into_response()
        }
    }
}

/// GET /admin/conflicts - Paginated unresolved device conflicts.
async fn list_conflicts(
    State(state): State<AppState>,
    staff: CurrentUser,
    Query(page): Query<PageRequest>,
) -> impl IntoResponse {
    if let Err(rejection) = staff.require_rank(UserRole::Staff) {
        return rejection.into_response();
    }

    let repo = DeviceConflictRepository::new((*state.db).clone());
    match repo.list_unresolved(&page).await {
        Ok((rows, total)) => {
            let infos: Vec<ConflictInfo> = rows.iter().map(conflict_info).collect();
            (StatusCode::OK, Json(PageResponse::new(infos, &page, total))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list device conflicts");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred listing conflicts"
                })),
            )
                .into_response()
        }
    }
}

/// POST /admin/conflicts/{id}/resolve - Acknowledge a device conflict.
///
/// Resolution is an administrative acknowledgment only; it never
/// reactivates devices or restores sessions.
async fn resolve_conflict(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(conflict_id): Path<Uuid>,
    Json(payload): Json<ResolveConflictRequest>,
) -> impl IntoResponse {
    if let Err(rejection) = admin.require_rank(UserRole::Admin) {
        return rejection.into_response();
    }

    if payload.resolution_notes.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "notes_required",
                "message": "Resolution notes are required"
            })),
        )
            .into_response();
    }

    let repo = DeviceConflictRepository::new((*state.db).clone());
    match repo
        .resolve(conflict_id, admin.user_id, &payload.resolution_notes)
        .await
    {
        Ok(conflict) => {
            info!(admin_id = %admin.user_id, conflict_id = %conflict_id, "Device conflict resolved");
            (StatusCode::OK, Json(conflict_info(&conflict))).into_response()
        }
        Err(ConflictError::NotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": format!("Conflict {id} not found")
            })),
        )
            .into_response(),
        Err(ConflictError::AlreadyResolved(id)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "already_resolved",
                "message": format!("Conflict {id} was already resolved")
            })),
        )
            .into_response(),
        Err(ConflictError::Database(e)) => {
            error!(error = %e, conflict_id = %conflict_id, "Conflict resolution failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred resolving the conflict"
                })),
            )
                .into_response()
        }
    }
}

/// Projects a conflict row into the API shape.
fn conflict_info(conflict: &device_conflicts::Model) -> ConflictInfo {
    ConflictInfo {
        id: conflict.id,
        user_id: conflict.user_id,
        new_device_id: conflict.new_device_id.clone(),
        old_device_ids: serde_json::from_value(conflict.old_device_ids.clone())
            .unwrap_or_default(),
        role: conflict.role.clone(),
        occurred_at: conflict.occurred_at.with_timezone(&chrono::Utc),
        resolved: conflict.resolved,
        resolution_notes: conflict.resolution_notes.clone(),
    }
}
