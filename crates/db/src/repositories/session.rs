//! Session repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionError, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use fieldgate_core::auth::UserRole;
use fieldgate_core::session::SessionPolicy;

use crate::entities::user_sessions;
use crate::token;

/// Errors from session storage operations.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// The refresh token was already rotated by a concurrent request.
    #[error("refresh token already rotated")]
    RotationConflict,
}

/// Session repository for session lifecycle operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new session for an authenticated user.
    ///
    /// Generates the refresh token internally and stores only its hash;
    /// the raw token is returned alongside the model and exists nowhere
    /// else. Expiry is scaled by role and the refresh chain starts now.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        user_id: Uuid,
        role: UserRole,
        device_id: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(user_sessions::Model, String), DbErr> {
        let now = chrono::Utc::now();
        let refresh_token = token::generate();

        let session = user_sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            role: Set(role.to_string()),
            device_id: Set(device_id.to_string()),
            ip_address: Set(ip_address.map(String::from)),
            user_agent: Set(user_agent.map(String::from)),
            refresh_token_hash: Set(token::hash(&refresh_token)),
            expires_at: Set(SessionPolicy::expiry_for(role, now).into()),
            chain_started_at: Set(now.into()),
            rotated_from: Set(None),
            revoked_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = session.insert(&self.db).await?;
        Ok((model, refresh_token))
    }

    /// Finds a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user_sessions::Model>, DbErr> {
        user_sessions::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds a non-revoked session by refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<user_sessions::Model>, DbErr> {
        let token_hash = token::hash(refresh_token);

        user_sessions::Entity::find()
            .filter(user_sessions::Column::RefreshTokenHash.eq(token_hash))
            .filter(user_sessions::Column::RevokedAt.is_null())
            .one(&self.db)
            .await
    }

    /// Rotates a session: revokes the parent and mints a child in one
    /// transaction.
    ///
    /// The revocation is a conditional update (`revoked_at IS NULL`); if
    /// a concurrent rotation got there first the condition matches zero
    /// rows and the whole transaction fails with `RotationConflict`, so
    /// one parent can never fork into two children. The child carries
    /// forward the parent's user, role, device, addressing metadata and
    /// `chain_started_at`; expiry is recomputed from the role policy.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError::RotationConflict` if the parent was
    /// already rotated, or `SessionStoreError::Database` on query failure.
    pub async fn rotate(
        &self,
        parent: &user_sessions::Model,
    ) -> Result<(user_sessions::Model, String), SessionStoreError> {
        let parent = parent.clone();
        let refresh_token = token::generate();
        let token_hash = token::hash(&refresh_token);

        let result = self
            .db
            .transaction::<_, user_sessions::Model, SessionStoreError>(move |txn| {
                Box::pin(async move {
                    let now = chrono::Utc::now();

                    let revoked = user_sessions::Entity::update_many()
                        .col_expr(
                            user_sessions::Column::RevokedAt,
                            sea_orm::sea_query::Expr::value(now),
                        )
                        .col_expr(
                            user_sessions::Column::UpdatedAt,
                            sea_orm::sea_query::Expr::value(now),
                        )
                        .filter(user_sessions::Column::Id.eq(parent.id))
                        .filter(user_sessions::Column::RevokedAt.is_null())
                        .exec(txn)
                        .await?;

                    if revoked.rows_affected != 1 {
                        return Err(SessionStoreError::RotationConflict);
                    }

                    let role = parent.role.parse::<UserRole>().unwrap_or(UserRole::Customer);
                    let child = user_sessions::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(parent.user_id),
                        role: Set(parent.role.clone()),
                        device_id: Set(parent.device_id.clone()),
                        ip_address: Set(parent.ip_address.clone()),
                        user_agent: Set(parent.user_agent.clone()),
                        refresh_token_hash: Set(token_hash),
                        expires_at: Set(SessionPolicy::expiry_for(role, now).into()),
                        chain_started_at: Set(parent.chain_started_at),
                        rotated_from: Set(Some(parent.id)),
                        revoked_at: Set(None),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                    };

                    Ok(child.insert(txn).await?)
                })
            })
            .await;

        match result {
            Ok(child) => Ok((child, refresh_token)),
            Err(TransactionError::Connection(e)) => Err(SessionStoreError::Database(e)),
            Err(TransactionError::Transaction(e)) => Err(e),
        }
    }

    /// Revokes a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke(&self, id: Uuid) -> Result<(), DbErr> {
        let now = chrono::Utc::now().into();

        user_sessions::ActiveModel {
            id: Set(id),
            revoked_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        Ok(())
    }

    /// Revokes all non-revoked sessions for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let now = chrono::Utc::now();

        let result = user_sessions::Entity::update_many()
            .col_expr(
                user_sessions::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .col_expr(
                user_sessions::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(user_sessions::Column::UserId.eq(user_id))
            .filter(user_sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Revokes all non-revoked sessions for a user except those bound to
    /// the given device. Used when a new device takes over the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_all_except_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<u64, DbErr> {
        let now = chrono::Utc::now();

        let result = user_sessions::Entity::update_many()
            .col_expr(
                user_sessions::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .col_expr(
                user_sessions::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(user_sessions::Column::UserId.eq(user_id))
            .filter(user_sessions::Column::DeviceId.ne(device_id))
            .filter(user_sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Counts live sessions for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_active_for_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        user_sessions::Entity::find()
            .filter(user_sessions::Column::UserId.eq(user_id))
            .filter(user_sessions::Column::RevokedAt.is_null())
            .filter(user_sessions::Column::ExpiresAt.gt(chrono::Utc::now()))
            .count(&self.db)
            .await
    }

    /// Deletes sessions past their expiry (for maintenance).
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self) -> Result<u64, DbErr> {
        let result = user_sessions::Entity::delete_many()
            .filter(user_sessions::Column::ExpiresAt.lt(chrono::Utc::now()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
