//! Device repository for the single-device policy.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionError, TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use fieldgate_core::auth::UserRole;
use fieldgate_core::device::TakeoverDecision;

use crate::entities::{device_conflicts, devices, user_sessions};
use crate::token;

/// Input for registering a device.
#[derive(Debug, Clone, Default)]
pub struct NewDevice {
    /// Client-computed fingerprint; a fresh one is generated when absent.
    pub fingerprint: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Client platform description.
    pub platform: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Coarse location label.
    pub location: Option<String>,
}

/// Outcome of a device registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    /// The registered device id.
    pub device_id: String,
    /// The most recently active device that was evicted, if the
    /// single-device policy forced a takeover.
    pub previous_device_id: Option<String>,
    /// The conflict audit record created for the takeover, if any.
    pub conflict_id: Option<Uuid>,
}

/// Device repository for registration and policy enforcement.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    db: DatabaseConnection,
}

impl DeviceRepository {
    /// Creates a new device repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Gets all currently active devices for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active_for_user(&self, user_id: Uuid) -> Result<Vec<devices::Model>, DbErr> {
        devices::Entity::find()
            .filter(devices::Column::UserId.eq(user_id))
            .filter(devices::Column::IsActive.eq(true))
            .order_by_desc(devices::Column::LastActive)
            .all(&self.db)
            .await
    }

    /// Gets all devices for a user, active and inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Vec<devices::Model>, DbErr> {
        devices::Entity::find()
            .filter(devices::Column::UserId.eq(user_id))
            .order_by_desc(devices::Column::LastActive)
            .all(&self.db)
            .await
    }

    /// Finds a device by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<devices::Model>, DbErr> {
        devices::Entity::find_by_id(id).one(&self.db).await
    }

    /// Updates a device's last-active instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn touch(&self, id: &str) -> Result<(), DbErr> {
        devices::ActiveModel {
            id: Set(id.to_string()),
            last_active: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        Ok(())
    }

    /// Registers a device for a user, enforcing the single-device policy.
    ///
    /// For device-limited roles with an occupied slot this is a takeover,
    /// executed as one transaction in a fixed order: (1) the conflict
    /// audit record is written first, so it always reflects the
    /// pre-takeover state, (2) every session not bound to the new device
    /// is revoked, (3) every other device is deactivated, (4) the new
    /// device is registered. If any step fails the transaction rolls
    /// back and nothing is left half-evicted.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails.
    pub async fn register_for_user(
        &self,
        user_id: Uuid,
        role: UserRole,
        new_device: NewDevice,
    ) -> Result<RegistrationOutcome, DbErr> {
        let device_id = new_device
            .fingerprint
            .clone()
            .unwrap_or_else(token::device_fingerprint);

        let active = self.find_active_for_user(user_id).await?;
        let active_ids: Vec<String> = active.into_iter().map(|d| d.id).collect();
        let decision = TakeoverDecision::decide(role, &active_ids);

        let evicted = match &decision {
            TakeoverDecision::Takeover { evicted } => evicted.clone(),
            TakeoverDecision::Unrestricted | TakeoverDecision::FirstDevice => vec![],
        };
        let logs_conflict = decision.logs_conflict();

        let txn_device_id = device_id.clone();
        let result = self
            .db
            .transaction::<_, Option<Uuid>, DbErr>(move |txn| {
                Box::pin(async move {
                    let now = chrono::Utc::now();

                    // Audit record first: it must describe the state it
                    // is about to change.
                    let conflict_id = if logs_conflict {
                        let conflict = device_conflicts::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            user_id: Set(user_id),
                            new_device_id: Set(txn_device_id.clone()),
                            old_device_ids: Set(serde_json::json!(evicted)),
                            role: Set(role.to_string()),
                            occurred_at: Set(now.into()),
                            resolved: Set(false),
                            resolution_notes: Set(None),
                            admin_resolved_by: Set(None),
                            admin_resolved_at: Set(None),
                        };
                        Some(conflict.insert(txn).await?.id)
                    } else {
                        None
                    };

                    if logs_conflict {
                        user_sessions::Entity::update_many()
                            .col_expr(
                                user_sessions::Column::RevokedAt,
                                sea_orm::sea_query::Expr::value(now),
                            )
                            .col_expr(
                                user_sessions::Column::UpdatedAt,
                                sea_orm::sea_query::Expr::value(now),
                            )
                            .filter(user_sessions::Column::UserId.eq(user_id))
                            .filter(user_sessions::Column::DeviceId.ne(txn_device_id.clone()))
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
                            .filter(devices::Column::UserId.eq(user_id))
                            .filter(devices::Column::Id.ne(txn_device_id.clone()))
                            .filter(devices::Column::IsActive.eq(true))
                            .exec(txn)
                            .await?;
                    }

                    let device = devices::ActiveModel {
                        id: Set(txn_device_id),
                        user_id: Set(user_id),
                        role: Set(role.to_string()),
                        user_agent: Set(new_device.user_agent),
                        platform: Set(new_device.platform),
                        ip_address: Set(new_device.ip_address),
                        location: Set(new_device.location),
                        is_active: Set(true),
                        first_used: Set(now.into()),
                        last_active: Set(now.into()),
                        created_at: Set(now.into()),
                    };

                    // A previously deactivated device re-registering with
                    // the same fingerprint reactivates in place.
                    devices::Entity::insert(device)
                        .on_conflict(
                            OnConflict::column(devices::Column::Id)
                                .update_columns([
                                    devices::Column::IsActive,
                                    devices::Column::LastActive,
                                    devices::Column::UserAgent,
                                    devices::Column::Platform,
                                    devices::Column::IpAddress,
                                    devices::Column::Location,
                                    devices::Column::Role,
                                ])
                                .to_owned(),
                        )
                        .exec(txn)
                        .await?;

                    Ok(conflict_id)
                })
            })
            .await;

        let conflict_id = match result {
            Ok(id) => id,
            Err(TransactionError::Connection(e) | TransactionError::Transaction(e)) => {
                return Err(e);
            }
        };

        Ok(RegistrationOutcome {
            device_id,
            previous_device_id: active_ids.first().cloned().filter(|_| logs_conflict),
            conflict_id,
        })
    }

    /// Deactivates every device belonging to a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let now = chrono::Utc::now();

        let result = devices::Entity::update_many()
            .col_expr(
                devices::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .col_expr(
                devices::Column::LastActive,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(devices::Column::UserId.eq(user_id))
            .filter(devices::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
