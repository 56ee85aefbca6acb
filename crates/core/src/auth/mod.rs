//! Roles, privilege ranking, and password hashing.
//!
//! This module provides:
//! - User role definitions with an explicit privilege ranking
//! - Role-scoped session and device policy queries
//! - Password hashing with Argon2id

mod password;

pub use password::{PasswordError, hash_password, verify_password};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User roles on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// End customer requesting repairs.
    Customer,
    /// Field technician performing repairs.
    Technician,
    /// Transporter moving devices between sites.
    Transporter,
    /// Back-office staff.
    Staff,
    /// Platform administrator.
    Admin,
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl UserRole {
    /// Privilege rank used for "this role or higher" checks.
    ///
    /// Ranks are explicit numbers rather than declaration order, so
    /// reordering the enum cannot silently change authorization.
    /// Technician and transporter share a rank: neither outranks the other.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Customer => 0,
            Self::Technician | Self::Transporter => 1,
            Self::Staff => 2,
            Self::Admin => 3,
        }
    }

    /// Returns true if this role's rank meets or exceeds `required`.
    #[must_use]
    pub const fn at_least(&self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// Returns true if this role is restricted to a single active device.
    #[must_use]
    pub const fn device_limited(&self) -> bool {
        matches!(self, Self::Technician | Self::Transporter)
    }

    /// Session lifetime for this role.
    ///
    /// Staff sessions last 12 hours and admin sessions 24; every other
    /// role gets the customer policy of 6 hours.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        match self {
            Self::Staff => chrono::Duration::hours(12),
            Self::Admin => chrono::Duration::hours(24),
            Self::Customer | Self::Technician | Self::Transporter => chrono::Duration::hours(6),
        }
    }

    /// All roles, for iteration in tests and seeds.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Customer,
            Self::Technician,
            Self::Transporter,
            Self::Staff,
            Self::Admin,
        ]
    }
}

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "technician" => Ok(Self::Technician),
            "transporter" => Ok(Self::Transporter),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Technician => write!(f, "technician"),
            Self::Transporter => write!(f, "transporter"),
            Self::Staff => write!(f, "staff"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_rank_ordering() {
        assert!(UserRole::Admin.at_least(UserRole::Staff));
        assert!(UserRole::Staff.at_least(UserRole::Technician));
        assert!(UserRole::Technician.at_least(UserRole::Customer));
        assert!(!UserRole::Customer.at_least(UserRole::Staff));
        assert!(!UserRole::Technician.at_least(UserRole::Staff));

        // Field roles share a rank: each satisfies the other.
        assert!(UserRole::Technician.at_least(UserRole::Transporter));
        assert!(UserRole::Transporter.at_least(UserRole::Technician));
    }

    #[test]
    fn test_device_limited_roles() {
        assert!(UserRole::Technician.device_limited());
        assert!(UserRole::Transporter.device_limited());
        assert!(!UserRole::Customer.device_limited());
        assert!(!UserRole::Staff.device_limited());
        assert!(!UserRole::Admin.device_limited());
    }

    #[rstest]
    #[case(UserRole::Customer, 6)]
    #[case(UserRole::Technician, 6)]
    #[case(UserRole::Transporter, 6)]
    #[case(UserRole::Staff, 12)]
    #[case(UserRole::Admin, 24)]
    fn test_session_ttl(#[case] role: UserRole, #[case] hours: i64) {
        assert_eq!(role.session_ttl(), chrono::Duration::hours(hours));
    }

    #[test]
    fn test_role_string_round_trip() {
        for role in UserRole::all() {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("dispatcher".parse::<UserRole>().is_err());
    }
}
