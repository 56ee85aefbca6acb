//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20260315_000001_users;
mod m20260315_000002_user_sessions;
mod m20260315_000003_devices;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260315_000001_users::Migration),
            Box::new(m20260315_000002_user_sessions::Migration),
            Box::new(m20260315_000003_devices::Migration),
        ]
    }
}
