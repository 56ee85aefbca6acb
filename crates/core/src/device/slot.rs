//! Device slot state machine.

use crate::auth::UserRole;

/// Outcome of presenting a new device for a user.
///
/// The slot for a device-limited role moves `NoActiveDevice ->
/// SingleActiveDevice(d1) -> SingleActiveDevice(d2)` with `d1` evicted;
/// no reachable state holds two active devices for such a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeoverDecision {
    /// Role is not device-limited; register without evicting anything.
    Unrestricted,
    /// Device-limited role with an empty slot; plain registration.
    FirstDevice,
    /// Device-limited role with an occupied slot; the listed devices
    /// must be evicted (and their sessions revoked) before the new
    /// device becomes active.
    Takeover {
        /// Active device ids to deactivate, in storage order.
        evicted: Vec<String>,
    },
}

impl TakeoverDecision {
    /// Decides what registering a new device means for this user.
    ///
    /// `active_device_ids` is the set of currently active devices; under
    /// correct operation it holds at most one entry for a limited role,
    /// but the decision evicts every entry so a violated invariant heals
    /// rather than persists.
    #[must_use]
    pub fn decide(role: UserRole, active_device_ids: &[String]) -> Self {
        if !role.device_limited() {
            return Self::Unrestricted;
        }
        if active_device_ids.is_empty() {
            return Self::FirstDevice;
        }
        Self::Takeover {
            evicted: active_device_ids.to_vec(),
        }
    }

    /// Whether this decision requires logging a device conflict.
    #[must_use]
    pub const fn logs_conflict(&self) -> bool {
        matches!(self, Self::Takeover { .. })
    }
}

/// Judges whether a presented device is authorized for a user.
///
/// - customer: no device constraint, always authorized
/// - technician/transporter: exactly one active device, and it must be
///   the presented one; anything else (empty slot, mismatch, or an
///   invariant-violating multi-device state) is unauthorized
/// - staff/admin: the presented device must be among the user's active
///   devices (registered-device check, not single-device)
#[must_use]
pub fn device_authorized(role: UserRole, presented: &str, active_device_ids: &[String]) -> bool {
    match role {
        UserRole::Customer => true,
        UserRole::Technician | UserRole::Transporter => {
            matches!(active_device_ids, [only] if only == presented)
        }
        UserRole::Staff | UserRole::Admin => {
            active_device_ids.iter().any(|id| id == presented)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_unrestricted_roles_never_take_over() {
        for role in [UserRole::Customer, UserRole::Staff, UserRole::Admin] {
            let decision = TakeoverDecision::decide(role, &ids(&["a", "b"]));
            assert_eq!(decision, TakeoverDecision::Unrestricted);
            assert!(!decision.logs_conflict());
        }
    }

    #[test]
    fn test_first_device_for_limited_role() {
        let decision = TakeoverDecision::decide(UserRole::Technician, &[]);
        assert_eq!(decision, TakeoverDecision::FirstDevice);
        assert!(!decision.logs_conflict());
    }

    #[test]
    fn test_takeover_evicts_all_active_devices() {
        let decision = TakeoverDecision::decide(UserRole::Transporter, &ids(&["a", "b"]));
        assert_eq!(
            decision,
            TakeoverDecision::Takeover {
                evicted: ids(&["a", "b"])
            }
        );
        assert!(decision.logs_conflict());
    }

    #[test]
    fn test_customer_always_authorized() {
        assert!(device_authorized(UserRole::Customer, "anything", &[]));
    }

    #[test]
    fn test_limited_role_requires_exact_single_match() {
        let active = ids(&["dev-a"]);
        assert!(device_authorized(UserRole::Technician, "dev-a", &active));
        assert!(!device_authorized(UserRole::Technician, "dev-b", &active));
        assert!(!device_authorized(UserRole::Technician, "dev-a", &[]));
        // Two active devices is an invariant violation; refuse rather
        // than pick one.
        assert!(!device_authorized(
            UserRole::Transporter,
            "dev-a",
            &ids(&["dev-a", "dev-b"])
        ));
    }

    #[test]
    fn test_staff_checks_membership() {
        let active = ids(&["dev-a", "dev-b"]);
        assert!(device_authorized(UserRole::Staff, "dev-b", &active));
        assert!(!device_authorized(UserRole::Admin, "dev-c", &active));
    }

    proptest! {
        /// Applying a decision leaves exactly one active device for a
        /// limited role (the new one), whatever state the slot was in.
        #[test]
        fn prop_limited_slot_never_holds_two(active in proptest::collection::vec("[a-z]{1,8}", 0..5)) {
            for role in [UserRole::Technician, UserRole::Transporter] {
                let decision = TakeoverDecision::decide(role, &active);
                let surviving = match &decision {
                    TakeoverDecision::Unrestricted => active.clone(),
                    TakeoverDecision::FirstDevice => vec![],
                    TakeoverDecision::Takeover { evicted } => {
                        active.iter().filter(|id| !evicted.contains(id)).cloned().collect()
                    }
                };
                // The new device joins `surviving` after execution; the
                // slot must then hold exactly one device.
                prop_assert_eq!(surviving.len(), 0);
            }
        }

        /// A takeover decision is logged exactly when the slot was occupied.
        #[test]
        fn prop_conflict_logged_iff_slot_occupied(active in proptest::collection::vec("[a-z]{1,8}", 0..5)) {
            let decision = TakeoverDecision::decide(UserRole::Technician, &active);
            prop_assert_eq!(decision.logs_conflict(), !active.is_empty());
        }
    }
}
