//! Device conflict repository for takeover audit records.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use thiserror::Error;
use uuid::Uuid;

use fieldgate_shared::types::PageRequest;

use crate::entities::device_conflicts;

/// Errors from conflict resolution.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// No conflict with the given id.
    #[error("conflict {0} not found")]
    NotFound(Uuid),

    /// The conflict was already resolved.
    #[error("conflict {0} already resolved")]
    AlreadyResolved(Uuid),
}

/// Repository for device takeover audit records.
///
/// Conflict rows are created inside the device takeover transaction;
/// this repository only reads them and applies admin resolution.
#[derive(Debug, Clone)]
pub struct DeviceConflictRepository {
    db: DatabaseConnection,
}

impl DeviceConflictRepository {
    /// Creates a new device conflict repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a conflict by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<device_conflicts::Model>, DbErr> {
        device_conflicts::Entity::find_by_id(id).one(&self.db).await
    }

    /// Gets unresolved conflicts for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_unresolved_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<device_conflicts::Model>, DbErr> {
        device_conflicts::Entity::find()
            .filter(device_conflicts::Column::UserId.eq(user_id))
            .filter(device_conflicts::Column::Resolved.eq(false))
            .order_by_desc(device_conflicts::Column::OccurredAt)
            .all(&self.db)
            .await
    }

    /// Lists unresolved conflicts across all users, newest first, with
    /// the total count for pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_unresolved(
        &self,
        page: &PageRequest,
    ) -> Result<(Vec<device_conflicts::Model>, u64), DbErr> {
        let query = device_conflicts::Entity::find()
            .filter(device_conflicts::Column::Resolved.eq(false));

        let total = query.clone().count(&self.db).await?;

        let rows = query
            .order_by_desc(device_conflicts::Column::OccurredAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((rows, total))
    }

    /// Marks a conflict resolved with admin attribution.
    ///
    /// Resolution is administrative acknowledgment only; it does not
    /// touch sessions or devices.
    ///
    /// # Errors
    ///
    /// Returns `ConflictError::NotFound` if no such conflict exists and
    /// `ConflictError::AlreadyResolved` if it was resolved before.
    pub async fn resolve(
        &self,
        conflict_id: Uuid,
        admin_id: Uuid,
        resolution_notes: &str,
    ) -> Result<device_conflicts::Model, ConflictError> {
        let conflict = self
            .find_by_id(conflict_id)
            .await?
            .ok_or(ConflictError::NotFound(conflict_id))?;

        if conflict.resolved {
            return Err(ConflictError::AlreadyResolved(conflict_id));
        }

        let updated = device_conflicts::ActiveModel {
            id: Set(conflict_id),
            resolved: Set(true),
            resolution_notes: Set(Some(resolution_notes.to_string())),
            admin_resolved_by: Set(Some(admin_id)),
            admin_resolved_at: Set(Some(chrono::Utc::now().into())),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        Ok(updated)
    }
}
