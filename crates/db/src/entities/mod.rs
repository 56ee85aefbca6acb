//! `SeaORM` entity definitions.

pub mod admin_actions;
pub mod device_conflicts;
pub mod devices;
pub mod user_sessions;
pub mod users;
