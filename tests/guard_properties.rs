//! Property tests for the pure lifecycle guards.
//!
//! The state machine and role sets are small enough to enumerate, so these
//! properties pin down the whole shape: which edges exist, which roles pass
//! which gates, and what the refusal errors carry.

use chrono::Utc;
use proptest::prelude::*;

use inspecta::error::LifecycleError;
use inspecta::lifecycle::guard::{
    self, APPROVER_ROLES, INSPECTOR_ROLES, PUBLISHER_ROLES, SCHEDULER_ROLES,
};
use inspecta::models::{Inspection, InspectionStatus, Role, User};

// -- Strategy helpers --

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Admin),
        Just(Role::TeamLead),
        Just(Role::TechnicalManager),
        Just(Role::Inspector),
        Just(Role::Client),
    ]
}

fn arb_status() -> impl Strategy<Value = InspectionStatus> {
    prop_oneof![
        Just(InspectionStatus::Draft),
        Just(InspectionStatus::InProgress),
        Just(InspectionStatus::Submitted),
        Just(InspectionStatus::Approved),
        Just(InspectionStatus::Rejected),
    ]
}

fn arb_decided() -> impl Strategy<Value = InspectionStatus> {
    prop_oneof![
        Just(InspectionStatus::Approved),
        Just(InspectionStatus::Rejected),
    ]
}

fn user(id: i64, role: Role) -> User {
    User {
        id,
        username: format!("user{}", id),
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

fn inspection(status: InspectionStatus, inspector_id: Option<i64>, created_by: Option<i64>) -> Inspection {
    Inspection {
        id: 7,
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
        created_by,
        updated_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// The whole transition graph: exactly the four workflow edges, nothing else.
#[test]
fn transition_graph_has_exactly_four_edges() {
    use InspectionStatus::*;
    let all = [Draft, InProgress, Submitted, Approved, Rejected];
    let edges: Vec<_> = all
        .iter()
        .flat_map(|&from| all.iter().map(move |&to| (from, to)))
        .filter(|&(from, to)| guard::is_valid_transition(from, to))
        .collect();
    assert_eq!(
        edges,
        vec![
            (Draft, InProgress),
            (InProgress, Submitted),
            (Submitted, Approved),
            (Submitted, Rejected),
        ]
    );
}

proptest! {
    /// Approved and rejected inspections never move again.
    #[test]
    fn no_transition_leaves_a_decided_state(from in arb_decided(), to in arb_status()) {
        prop_assert!(!guard::is_valid_transition(from, to));
    }

    /// The state machine has no self-loops.
    #[test]
    fn no_self_transitions(status in arb_status()) {
        prop_assert!(!guard::is_valid_transition(status, status));
    }

    /// Each gate passes exactly the roles in its published set.
    #[test]
    fn gates_match_their_role_sets(role in arb_role()) {
        let u = user(1, role);
        prop_assert_eq!(
            guard::require_inspector(&u, "x").is_ok(),
            INSPECTOR_ROLES.contains(&role)
        );
        prop_assert_eq!(
            guard::require_approver(&u, "x").is_ok(),
            APPROVER_ROLES.contains(&role)
        );
        prop_assert_eq!(
            guard::require_publisher(&u, "x").is_ok(),
            PUBLISHER_ROLES.contains(&role)
        );
        prop_assert_eq!(
            guard::require_scheduler(&u, "x").is_ok(),
            SCHEDULER_ROLES.contains(&role)
        );
    }

    /// Publishing is the narrowest gate: anyone who can publish can also
    /// inspect and approve.
    #[test]
    fn publishers_can_inspect_and_approve(role in arb_role()) {
        let u = user(1, role);
        if guard::require_publisher(&u, "x").is_ok() {
            prop_assert!(guard::require_inspector(&u, "x").is_ok());
            prop_assert!(guard::require_approver(&u, "x").is_ok());
        }
    }

    /// Whoever hands out work can also do it.
    #[test]
    fn schedulers_can_inspect(role in arb_role()) {
        let u = user(1, role);
        if guard::require_scheduler(&u, "x").is_ok() {
            prop_assert!(guard::require_inspector(&u, "x").is_ok());
        }
    }

    /// Portal accounts pass no workflow gate.
    #[test]
    fn client_role_is_always_denied(_seed in any::<u8>()) {
        let u = user(1, Role::Client);
        prop_assert!(guard::require_inspector(&u, "x").is_err());
        prop_assert!(guard::require_approver(&u, "x").is_err());
        prop_assert!(guard::require_publisher(&u, "x").is_err());
        prop_assert!(guard::require_scheduler(&u, "x").is_err());
    }

    /// A refusal names the attempted action and the caller's role.
    #[test]
    fn role_denied_error_names_action_and_role(role in arb_role()) {
        let u = user(1, role);
        if let Err(LifecycleError::RoleDenied { action, actual, .. }) =
            guard::require_publisher(&u, "publish results")
        {
            prop_assert_eq!(action, "publish results");
            prop_assert_eq!(actual, role.to_string());
        }
    }

    /// Non-admins may only touch inspections they are assigned to or created;
    /// admins may touch anything.
    #[test]
    fn ownership_check(
        user_id in 1i64..100,
        inspector_id in proptest::option::of(1i64..100),
        created_by in proptest::option::of(1i64..100),
        role in arb_role(),
    ) {
        let u = user(user_id, role);
        let i = inspection(InspectionStatus::Draft, inspector_id, created_by);
        let allowed = guard::require_owner_or_admin(&u, &i).is_ok();
        let expected = role == Role::Admin
            || inspector_id == Some(user_id)
            || created_by == Some(user_id);
        prop_assert_eq!(allowed, expected);
    }

    /// require_transition agrees with is_valid_transition and reports the
    /// states it refused.
    #[test]
    fn require_transition_mirrors_the_graph(from in arb_status(), to in arb_status()) {
        let i = inspection(from, None, None);
        match guard::require_transition(&i, to) {
            Ok(()) => prop_assert!(guard::is_valid_transition(from, to)),
            Err(e) => {
                prop_assert!(!guard::is_valid_transition(from, to));
                let msg = e.to_string();
                prop_assert!(msg.contains(from.as_str()));
                prop_assert!(msg.contains(to.as_str()));
            }
        }
    }
}
