//! Devices migration for the single-device policy.
//!
//! Creates the devices table, the device_conflicts takeover audit
//! table, and the admin_actions log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DEVICES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS admin_actions CASCADE;
             DROP TABLE IF EXISTS device_conflicts CASCADE;
             DROP TABLE IF EXISTS devices CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const DEVICES_SQL: &str = r"
-- Devices bound to users; deactivated on eviction, never deleted
CREATE TABLE devices (
    id VARCHAR(64) PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role VARCHAR(20) NOT NULL,
    user_agent TEXT,
    platform VARCHAR(64),
    ip_address VARCHAR(45),
    location VARCHAR(128),
    is_active BOOLEAN NOT NULL DEFAULT true,
    first_used TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_active TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Hot lookup: a user's active devices. The single-active-device rule for
-- field roles is role-dependent and enforced by the takeover transaction,
-- not by a unique index.
CREATE INDEX idx_devices_user_active ON devices(user_id) WHERE is_active;

-- Takeover audit trail; written before the eviction it describes
CREATE TABLE device_conflicts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    new_device_id VARCHAR(64) NOT NULL,
    old_device_ids JSONB NOT NULL,
    role VARCHAR(20) NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    resolved BOOLEAN NOT NULL DEFAULT false,
    resolution_notes TEXT,
    admin_resolved_by UUID REFERENCES users(id),
    admin_resolved_at TIMESTAMPTZ
);

-- Admin dashboard lists unresolved conflicts, newest first
CREATE INDEX idx_device_conflicts_unresolved ON device_conflicts(occurred_at DESC) WHERE NOT resolved;
CREATE INDEX idx_device_conflicts_user ON device_conflicts(user_id, occurred_at DESC);

-- Immutable log of administrative interventions
CREATE TABLE admin_actions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    admin_id UUID NOT NULL REFERENCES users(id),
    target_user_id UUID,
    action VARCHAR(40) NOT NULL,
    reason TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_admin_actions_target ON admin_actions(target_user_id, created_at DESC);
";
