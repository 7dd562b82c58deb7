//! Access policy evaluation.
//!
//! Pure functions over a verified [`Session`]. Nothing here touches the
//! store, so callers can decide access before opening a transaction.

use crate::auth::Session;
use crate::models::{Appointment, Role};

/// Roles allowed to author records and prescriptions.
pub const CLINICAL_AUTHORS: &[Role] = &[Role::Doctor, Role::Admin];

/// Roles that see and update the emergency queue.
pub const DISPATCHERS: &[Role] = &[Role::Admin, Role::Staff];

/// Roles allowed to search across patients, doctors and records.
pub const SEARCHERS: &[Role] = &[Role::Doctor, Role::Admin, Role::Staff];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No session presented
    Unauthenticated,
    /// Session present but lacks the role or does not own the resource
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Ownership requirement attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Any,
    /// A patient may only act on this patient id. Non-patient roles pass.
    PatientSelf(i64),
}

/// What an operation requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRule<'r> {
    /// Empty means any authenticated role, including none
    pub roles: &'r [Role],
    pub owner: Ownership,
}

impl<'r> AccessRule<'r> {
    /// Any authenticated caller.
    pub const fn authenticated() -> Self {
        Self {
            roles: &[],
            owner: Ownership::Any,
        }
    }

    pub const fn roles(roles: &'r [Role]) -> Self {
        Self {
            roles,
            owner: Ownership::Any,
        }
    }

    /// Patients limited to their own data; everyone else with a role allowed.
    pub const fn patient_data(patient_id: i64) -> Self {
        Self {
            roles: &[],
            owner: Ownership::PatientSelf(patient_id),
        }
    }
}

/// Decide whether `session` satisfies `rule`.
pub fn authorize(session: Option<&Session>, rule: &AccessRule<'_>) -> Decision {
    let Some(session) = session else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    if !rule.roles.is_empty() && !session.role.is_some_and(|r| rule.roles.contains(&r)) {
        return Decision::Deny(DenyReason::Forbidden);
    }

    match rule.owner {
        Ownership::Any => Decision::Allow,
        Ownership::PatientSelf(patient_id) => match session.role {
            Some(Role::Patient) if session.patient_id == Some(patient_id) => Decision::Allow,
            Some(Role::Patient) => Decision::Deny(DenyReason::Forbidden),
            Some(Role::Doctor | Role::Hospital | Role::Staff | Role::Admin) => Decision::Allow,
            None => Decision::Deny(DenyReason::Forbidden),
        },
    }
}

/// Decide whether `session` may modify `appointment`.
pub fn authorize_appointment_change(session: Option<&Session>, appointment: &Appointment) -> Decision {
    let Some(session) = session else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    let allowed = match session.role {
        Some(Role::Patient) => session.patient_id == Some(appointment.patient_id),
        Some(Role::Doctor) => session.doctor_id == Some(appointment.doctor_id),
        Some(Role::Staff | Role::Admin) => true,
        Some(Role::Hospital) | None => false,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn session(role: Option<Role>, patient_id: Option<i64>, doctor_id: Option<i64>) -> Session {
        Session {
            sub: 1,
            username: "u".into(),
            role,
            patient_id,
            doctor_id,
            iat: 0,
            exp: i64::MAX,
            jti: "jti".into(),
        }
    }

    fn appointment(patient_id: i64, doctor_id: i64) -> Appointment {
        Appointment {
            id: 1,
            patient_id,
            doctor_id,
            hospital_id: None,
            scheduled_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            status: AppointmentStatus::Pending,
            reason: None,
            is_teleconsultation: false,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_no_session_is_unauthenticated() {
        assert_eq!(
            authorize(None, &AccessRule::authenticated()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            authorize_appointment_change(None, &appointment(1, 1)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_role_gate() {
        let doctor = session(Some(Role::Doctor), None, Some(3));
        let patient = session(Some(Role::Patient), Some(7), None);
        let rule = AccessRule::roles(CLINICAL_AUTHORS);

        assert_eq!(authorize(Some(&doctor), &rule), Decision::Allow);
        assert_eq!(
            authorize(Some(&patient), &rule),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_patient_self_only() {
        let patient = session(Some(Role::Patient), Some(7), None);

        assert_eq!(authorize(Some(&patient), &AccessRule::patient_data(7)), Decision::Allow);
        assert_eq!(
            authorize(Some(&patient), &AccessRule::patient_data(8)),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_patient_without_link_is_denied() {
        let patient = session(Some(Role::Patient), None, None);
        assert_eq!(
            authorize(Some(&patient), &AccessRule::patient_data(7)),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_roleless_session() {
        let roleless = session(None, Some(7), None);

        assert_eq!(authorize(Some(&roleless), &AccessRule::authenticated()), Decision::Allow);
        assert_eq!(
            authorize(Some(&roleless), &AccessRule::roles(SEARCHERS)),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            authorize(Some(&roleless), &AccessRule::patient_data(7)),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_appointment_change_rules() {
        let appt = appointment(7, 3);

        let owner = session(Some(Role::Patient), Some(7), None);
        let stranger = session(Some(Role::Patient), Some(8), None);
        let assigned = session(Some(Role::Doctor), None, Some(3));
        let other_doctor = session(Some(Role::Doctor), None, Some(4));
        let staff = session(Some(Role::Staff), None, None);
        let hospital = session(Some(Role::Hospital), None, None);

        assert!(authorize_appointment_change(Some(&owner), &appt).is_allowed());
        assert!(!authorize_appointment_change(Some(&stranger), &appt).is_allowed());
        assert!(authorize_appointment_change(Some(&assigned), &appt).is_allowed());
        assert!(!authorize_appointment_change(Some(&other_doctor), &appt).is_allowed());
        assert!(authorize_appointment_change(Some(&staff), &appt).is_allowed());
        assert!(!authorize_appointment_change(Some(&hospital), &appt).is_allowed());
    }

    fn any_role() -> impl Strategy<Value = Option<Role>> {
        prop_oneof![Just(None), proptest::sample::select(Role::ALL.to_vec()).prop_map(Some)]
    }

    proptest! {
        #[test]
        fn prop_patient_sees_only_own_data(own in 1i64..1000, target in 1i64..1000) {
            let patient = session(Some(Role::Patient), Some(own), None);
            let decision = authorize(Some(&patient), &AccessRule::patient_data(target));
            prop_assert_eq!(decision.is_allowed(), own == target);
        }

        #[test]
        fn prop_role_gate_matches_membership(role in any_role(), target in 1i64..1000) {
            let s = session(role, Some(target), None);
            let decision = authorize(Some(&s), &AccessRule::roles(DISPATCHERS));
            let expected = role.is_some_and(|r| DISPATCHERS.contains(&r));
            prop_assert_eq!(decision.is_allowed(), expected);
        }

        #[test]
        fn prop_denials_are_forbidden_when_authenticated(
            role in any_role(),
            own in proptest::option::of(1i64..50),
            target in 1i64..50,
        ) {
            let s = session(role, own, None);
            for rule in [
                AccessRule::patient_data(target),
                AccessRule::roles(CLINICAL_AUTHORS),
                AccessRule { roles: SEARCHERS, owner: Ownership::PatientSelf(target) },
            ] {
                if let Decision::Deny(reason) = authorize(Some(&s), &rule) {
                    prop_assert_eq!(reason, DenyReason::Forbidden);
                }
            }
        }
    }
}
