//! Pure guard predicates for lifecycle transitions.
//!
//! Everything here is side-effect free so the rules can be tested without a
//! database. The lifecycle services call these before touching rows.

use crate::error::{LifecycleError, LifecycleResult};
use crate::models::{Inspection, InspectionStatus, Role, User};

/// Roles allowed to execute inspections (assign, start, submit).
pub const INSPECTOR_ROLES: &[Role] = &[Role::Admin, Role::Inspector, Role::TeamLead];

/// Roles allowed to decide submitted inspections.
pub const APPROVER_ROLES: &[Role] = &[Role::Admin, Role::TechnicalManager, Role::TeamLead];

/// Roles allowed to publish and revoke job order results.
pub const PUBLISHER_ROLES: &[Role] = &[Role::Admin, Role::TeamLead];

/// Roles allowed to put inspectors on job order line items.
pub const SCHEDULER_ROLES: &[Role] = &[Role::Admin, Role::TeamLead];

/// The legal inspection transitions. Decided inspections are final.
pub fn is_valid_transition(from: InspectionStatus, to: InspectionStatus) -> bool {
    use InspectionStatus::*;
    matches!(
        (from, to),
        (Draft, InProgress) | (InProgress, Submitted) | (Submitted, Approved) | (Submitted, Rejected)
    )
}

fn role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Refuse callers whose role is not in `allowed`.
pub fn require_role(user: &User, action: &'static str, allowed: &[Role]) -> LifecycleResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(LifecycleError::RoleDenied {
            action,
            required: role_list(allowed),
            actual: user.role.to_string(),
        })
    }
}

pub fn require_inspector(user: &User, action: &'static str) -> LifecycleResult<()> {
    require_role(user, action, INSPECTOR_ROLES)
}

pub fn require_approver(user: &User, action: &'static str) -> LifecycleResult<()> {
    require_role(user, action, APPROVER_ROLES)
}

pub fn require_publisher(user: &User, action: &'static str) -> LifecycleResult<()> {
    require_role(user, action, PUBLISHER_ROLES)
}

pub fn require_scheduler(user: &User, action: &'static str) -> LifecycleResult<()> {
    require_role(user, action, SCHEDULER_ROLES)
}

/// Admins may act on any inspection; everyone else only on inspections they
/// are assigned to or created.
pub fn require_owner_or_admin(user: &User, inspection: &Inspection) -> LifecycleResult<()> {
    if user.is_admin()
        || inspection.inspector_id == Some(user.id)
        || inspection.created_by == Some(user.id)
    {
        Ok(())
    } else {
        Err(LifecycleError::NotOwner { id: inspection.id })
    }
}

/// Refuse transitions outside the state machine.
pub fn require_transition(
    inspection: &Inspection,
    to: InspectionStatus,
) -> LifecycleResult<()> {
    if is_valid_transition(inspection.status, to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            entity: "inspection",
            id: inspection.id,
            from: inspection.status.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_role(role: Role) -> User {
        User {
            id: 10,
            username: "u".to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            competence: String::new(),
            phone: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn inspection_with(status: InspectionStatus, inspector_id: Option<i64>) -> Inspection {
        Inspection {
            id: 1,
            job_line_item_id: 1,
            inspector_id,
            checklist_template: String::new(),
            start_time: None,
            end_time: None,
            status,
            version: 1,
            geo_location_lat: None,
            geo_location_lng: None,
            inspector_signature_uri: None,
            client_signature_uri: None,
            created_by: None,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        use InspectionStatus::*;
        assert!(is_valid_transition(Draft, InProgress));
        assert!(is_valid_transition(InProgress, Submitted));
        assert!(is_valid_transition(Submitted, Approved));
        assert!(is_valid_transition(Submitted, Rejected));
    }

    #[test]
    fn test_decided_states_are_final() {
        use InspectionStatus::*;
        for to in [Draft, InProgress, Submitted, Approved, Rejected] {
            assert!(!is_valid_transition(Approved, to));
            assert!(!is_valid_transition(Rejected, to));
        }
    }

    #[test]
    fn test_no_skipping_states() {
        use InspectionStatus::*;
        assert!(!is_valid_transition(Draft, Submitted));
        assert!(!is_valid_transition(Draft, Approved));
        assert!(!is_valid_transition(InProgress, Approved));
    }

    #[test]
    fn test_approver_roles() {
        assert!(require_approver(&user_with_role(Role::TechnicalManager), "approve").is_ok());
        assert!(require_approver(&user_with_role(Role::TeamLead), "approve").is_ok());
        assert!(require_approver(&user_with_role(Role::Admin), "approve").is_ok());
        assert!(matches!(
            require_approver(&user_with_role(Role::Inspector), "approve"),
            Err(LifecycleError::RoleDenied { .. })
        ));
        assert!(require_approver(&user_with_role(Role::Client), "approve").is_err());
    }

    #[test]
    fn test_publisher_roles_exclude_technical_manager() {
        assert!(require_publisher(&user_with_role(Role::TeamLead), "publish").is_ok());
        assert!(require_publisher(&user_with_role(Role::TechnicalManager), "publish").is_err());
    }

    #[test]
    fn test_scheduler_roles_exclude_plain_inspectors() {
        assert!(require_scheduler(&user_with_role(Role::TeamLead), "assign").is_ok());
        assert!(require_scheduler(&user_with_role(Role::Admin), "assign").is_ok());
        assert!(require_scheduler(&user_with_role(Role::Inspector), "assign").is_err());
    }

    #[test]
    fn test_owner_check() {
        let inspector = user_with_role(Role::Inspector);
        let owned = inspection_with(InspectionStatus::Draft, Some(inspector.id));
        let other = inspection_with(InspectionStatus::Draft, Some(999));

        assert!(require_owner_or_admin(&inspector, &owned).is_ok());
        assert!(matches!(
            require_owner_or_admin(&inspector, &other),
            Err(LifecycleError::NotOwner { .. })
        ));

        let admin = user_with_role(Role::Admin);
        assert!(require_owner_or_admin(&admin, &other).is_ok());
    }

    #[test]
    fn test_transition_error_reports_states() {
        let inspection = inspection_with(InspectionStatus::Draft, None);
        let err = require_transition(&inspection, InspectionStatus::Approved).unwrap_err();
        assert!(err.to_string().contains("DRAFT -> APPROVED"));
    }
}
