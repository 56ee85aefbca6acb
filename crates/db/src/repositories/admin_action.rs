//! Admin action log repository and force-logout.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{admin_actions, devices, user_sessions};

/// Repository for the immutable admin action log.
#[derive(Debug, Clone)]
pub struct AdminActionRepository {
    db: DatabaseConnection,
}

impl AdminActionRepository {
    /// Creates a new admin action repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an administrative action. Insert-only; rows are never
    /// updated or deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn record(
        &self,
        admin_id: Uuid,
        target_user_id: Option<Uuid>,
        action: &str,
        reason: &str,
    ) -> Result<admin_actions::Model, DbErr> {
        let entry = admin_actions::ActiveModel {
            id: Set(Uuid::new_v4()),
            admin_id: Set(admin_id),
            target_user_id: Set(target_user_id),
            action: Set(action.to_string()),
            reason: Set(reason.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        entry.insert(&self.db).await
    }

    /// Force-logs-out a user: revokes every session, deactivates every
    /// device, and records the action, all in one transaction. The log
    /// entry therefore exists exactly when the whole intervention
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails; no
    /// partial logout is left behind.
    pub async fn force_logout(
        &self,
        target_user_id: Uuid,
        admin_id: Uuid,
        reason: &str,
    ) -> Result<(), DbErr> {
        let reason = reason.to_string();

        let result = self
            .db
            .transaction::<_, (), DbErr>(move |txn| {
                Box::pin(async move {
                    let now = chrono::Utc::now();

                    user_sessions::Entity::update_many()
                        .col_expr(
                            user_sessions::Column::RevokedAt,
                            sea_orm::sea_query::Expr::value(now),
                        )
                        .col_expr(
                            user_sessions::Column::UpdatedAt,
                            sea_orm::sea_query::Expr::value(now),
                        )
                        .filter(user_sessions::Column::UserId.eq(target_user_id))
                        .filter(user_sessions::Column::RevokedAt.is_null())
                        .exec(txn)
                        .await?;

                    devices::Entity::update_many()
                        .col_expr(
                            devices::Column::IsActive,
                            sea_orm::sea_query::Expr::value(false),
                        )
                        .col_expr(
                            devices::Column::LastActive,
                            sea_orm::sea_query::Expr::value(now),
                        )
                        .filter(devices::Column::UserId.eq(target_user_id))
                        .filter(devices::Column::IsActive.eq(true))
                        .exec(txn)
                        .await?;

                    let entry = admin_actions::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        admin_id: Set(admin_id),
                        target_user_id: Set(Some(target_user_id)),
                        action: Set("force_logout".to_string()),
                        reason: Set(reason),
                        created_at: Set(now.into()),
                    };
                    entry.insert(txn).await?;

                    Ok(())
                })
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Connection(e) | TransactionError::Transaction(e)) => Err(e),
        }
    }
}
