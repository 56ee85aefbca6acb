//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod admin_action;
pub mod device;
pub mod device_conflict;
pub mod session;
pub mod user;

pub use admin_action::AdminActionRepository;
pub use device::{DeviceRepository, NewDevice, RegistrationOutcome};
pub use device_conflict::{ConflictError, DeviceConflictRepository};
pub use session::{SessionRepository, SessionStoreError};
pub use user::UserRepository;
