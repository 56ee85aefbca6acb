//! Single-device policy and takeover decisions.
//!
//! Field roles (technician, transporter) may hold at most one active
//! device at a time; a login from a new device evicts the old one. The
//! decision logic is pure so the persistence layer can execute it inside
//! a transaction and the tests can drive it exhaustively.

mod slot;

pub use slot::{TakeoverDecision, device_authorized};
