//! Shared types, errors, and configuration for Fieldgate.
//!
//! This crate provides common types used across all other crates:
//! - Authentication request/response payloads
//! - JWT access token handling
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
