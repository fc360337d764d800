//! Inspection lifecycle integration tests.
//!
//! Full workflow: create -> assign -> start -> answers -> submit ->
//! approve/reject, with the version token checked at every step, then
//! publication of the parent job order.
//!
//! All tests are `#[ignore]` since they require a live database with the
//! migrations applied.
//!
//! Run all tests:
//!   DATABASE_URL="postgresql://localhost:5432/inspecta" cargo test \
//!     --test inspection_lifecycle -- --ignored --nocapture
//!
//! Run a single test:
//!   DATABASE_URL="postgresql://localhost:5432/inspecta" cargo test \
//!     --test inspection_lifecycle test_full_inspection_lifecycle -- --ignored --nocapture

use sqlx::PgPool;
use uuid::Uuid;

use inspecta::checklist::{ChecklistRegistry, ChecklistTemplate};
use inspecta::database::{
    AuditAction, AuditLogger, ClientService, CreateClientRequest, CreateInspectionRequest,
    CreateJobOrderRequest, CreateLineItemRequest, CreateUserRequest, InspectionService,
    JobOrderService, UserService,
};
use inspecta::error::LifecycleError;
use inspecta::lifecycle::{InspectionLifecycle, PublicationLifecycle, RecordAnswerRequest};
use inspecta::models::{
    AnswerResult, InspectionStatus, JobOrderStatus, LineItemStatus, Role, User,
};

// =========================================================================
// Test Infrastructure
// =========================================================================

/// Create a database pool from the DATABASE_URL environment variable.
async fn create_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| panic!("DATABASE_URL must be set for integration tests"));
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to database")
}

/// Unique suffix so tests can run repeatedly against the same database.
fn uniq() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

async fn create_user(pool: &PgPool, role: Role) -> User {
    UserService::new(pool.clone())
        .create(CreateUserRequest {
            username: format!("test-{}-{}", role.as_str().to_lowercase(), uniq()),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            competence: String::new(),
            phone: String::new(),
        })
        .await
        .expect("create user")
}

struct Fixture {
    pool: PgPool,
    admin: User,
    inspector: User,
    approver: User,
    job_order_id: i64,
    line_item_id: i64,
    inspection_id: i64,
}

/// Seed a client, job order, one line item and a draft inspection.
async fn seed(checklist_template: &str) -> Fixture {
    let pool = create_pool().await;

    let admin = create_user(&pool, Role::Admin).await;
    let inspector = create_user(&pool, Role::Inspector).await;
    let approver = create_user(&pool, Role::TechnicalManager).await;

    let client = ClientService::new(pool.clone())
        .create(
            CreateClientRequest {
                name: format!("Test Client {}", uniq()),
                contact_person: String::new(),
                email: format!("ops-{}@example.com", uniq()),
                phone: String::new(),
                address: String::new(),
                billing_reference: String::new(),
            },
            admin.id,
        )
        .await
        .expect("create client");

    let orders = JobOrderService::new(pool.clone());
    let order = orders
        .create(
            CreateJobOrderRequest {
                client_id: client.id,
                po_reference: format!("PO-{}", uniq()),
                site_location: "Yard 3".to_string(),
                scheduled_start: None,
                scheduled_end: None,
                tentative_date: None,
                notes: String::new(),
            },
            admin.id,
        )
        .await
        .expect("create job order");

    let item = orders
        .add_line_item(
            order.id,
            CreateLineItemRequest {
                equipment_id: None,
                item_type: "INSPECTION".to_string(),
                description: "Overhead crane, bay 2".to_string(),
                quantity: 1,
            },
            admin.id,
        )
        .await
        .expect("add line item");

    let inspection = InspectionService::new(pool.clone())
        .create(
            CreateInspectionRequest {
                job_line_item_id: item.id,
                inspector_id: None,
                checklist_template: checklist_template.to_string(),
            },
            admin.id,
        )
        .await
        .expect("create inspection");
    assert_eq!(inspection.status, InspectionStatus::Draft);
    assert_eq!(inspection.version, 1);

    Fixture {
        pool,
        admin,
        inspector,
        approver,
        job_order_id: order.id,
        line_item_id: item.id,
        inspection_id: inspection.id,
    }
}

fn registry_with(template: ChecklistTemplate) -> ChecklistRegistry {
    let mut registry = ChecklistRegistry::new();
    registry.insert(template);
    registry
}

fn lift_basic() -> ChecklistTemplate {
    ChecklistTemplate::from_yaml(
        r#"
name: lift_basic
level: SIMPLIFIED
questions:
  - key: hook_ok
    text: Hook and latch serviceable
  - key: rope_ok
    text: Wire rope free of defects
"#,
    )
    .expect("parse template")
}

// =========================================================================
// Full Happy Path
// =========================================================================

/// DRAFT -> (assign) -> IN_PROGRESS -> SUBMITTED -> APPROVED, version
/// bumped on every write, line item completed, audit trail populated,
/// then the job order published.
#[tokio::test]
#[ignore = "requires database"]
async fn test_full_inspection_lifecycle() {
    let f = seed("lift_basic").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());
    let registry = registry_with(lift_basic());

    // Assign keeps the inspection in DRAFT but bumps the version.
    let i = lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect("assign");
    assert_eq!(i.status, InspectionStatus::Draft);
    assert_eq!(i.inspector_id, Some(f.inspector.id));
    assert_eq!(i.version, 2);

    let i = lifecycle
        .start(f.inspection_id, i.version, &f.inspector, None)
        .await
        .expect("start");
    assert_eq!(i.status, InspectionStatus::InProgress);
    assert_eq!(i.version, 3);
    assert!(i.start_time.is_some());

    for key in ["hook_ok", "rope_ok"] {
        lifecycle
            .record_answer(
                &registry,
                f.inspection_id,
                &RecordAnswerRequest {
                    question_key: key.to_string(),
                    result: AnswerResult::Safe,
                    comment: String::new(),
                },
            )
            .await
            .expect("record answer");
    }
    let unsafe_found = InspectionService::new(f.pool.clone())
        .has_unsafe_answer(f.inspection_id)
        .await
        .expect("check answers");
    assert!(!unsafe_found);

    let i = lifecycle
        .submit(f.inspection_id, i.version, &f.inspector, None)
        .await
        .expect("submit");
    assert_eq!(i.status, InspectionStatus::Submitted);
    assert_eq!(i.version, 4);

    let i = lifecycle
        .approve(f.inspection_id, i.version, "All points safe", &f.approver, None)
        .await
        .expect("approve");
    assert_eq!(i.status, InspectionStatus::Approved);
    assert_eq!(i.version, 5);

    // The line item follows the inspection to COMPLETED.
    let item = JobOrderService::new(f.pool.clone())
        .find_line_item(f.line_item_id)
        .await
        .expect("find line item")
        .expect("line item exists");
    assert_eq!(item.status, LineItemStatus::Completed);

    // Every step left an audit row; the decision is recorded explicitly.
    let trail = AuditLogger::new(f.pool.clone())
        .history("INSPECTION", f.inspection_id)
        .await
        .expect("audit history");
    assert!(trail.len() >= 4);
    assert!(trail.iter().any(|e| e.action == AuditAction::Approve));

    // One decision, one approval row.
    let decisions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM approvals WHERE entity_type = 'INSPECTION' AND entity_id = $1",
    )
    .bind(f.inspection_id)
    .fetch_one(&f.pool)
    .await
    .expect("count approvals");
    assert_eq!(decisions, 1);

    // With an approved inspection the order can go out to the client.
    let publications = PublicationLifecycle::new(f.pool.clone());
    let publication = publications
        .publish(f.job_order_id, "First release", &f.admin, None)
        .await
        .expect("publish");
    assert_eq!(publication.job_order_id, f.job_order_id);

    let order = JobOrderService::new(f.pool.clone())
        .find_by_id(f.job_order_id)
        .await
        .expect("find order")
        .expect("order exists");
    assert_eq!(order.status, JobOrderStatus::Published);
}

// =========================================================================
// Bulk Assignment
// =========================================================================

/// One call fans an inspector out over a set of line items. Items already
/// carrying an inspection are skipped, so the call can be replayed safely.
#[tokio::test]
#[ignore = "requires database"]
async fn test_bulk_assign_line_items() {
    let f = seed("").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());
    let orders = JobOrderService::new(f.pool.clone());

    let mut extra = Vec::new();
    for n in 0..2 {
        let item = orders
            .add_line_item(
                f.job_order_id,
                CreateLineItemRequest {
                    equipment_id: None,
                    item_type: "INSPECTION".to_string(),
                    description: format!("Forklift {}", n + 1),
                    quantity: 1,
                },
                f.admin.id,
            )
            .await
            .expect("add line item");
        extra.push(item.id);
    }

    // The seeded item already has an inspection; only the two new items
    // get one.
    let targets = vec![f.line_item_id, extra[0], extra[1]];
    let created = lifecycle
        .assign_line_items(f.job_order_id, f.inspector.id, &targets, &f.admin, None)
        .await
        .expect("bulk assign");
    assert_eq!(created.len(), 2);

    let inspections = InspectionService::new(f.pool.clone());
    for id in &created {
        let i = inspections
            .find_by_id(*id)
            .await
            .expect("find inspection")
            .expect("inspection exists");
        assert_eq!(i.status, InspectionStatus::Draft);
        assert_eq!(i.inspector_id, Some(f.inspector.id));
    }
    for item_id in &extra {
        let item = orders
            .find_line_item(*item_id)
            .await
            .expect("find line item")
            .expect("line item exists");
        assert_eq!(item.status, LineItemStatus::Assigned);
    }

    // Replaying the same set creates nothing new.
    let replay = lifecycle
        .assign_line_items(f.job_order_id, f.inspector.id, &targets, &f.admin, None)
        .await
        .expect("replay");
    assert!(replay.is_empty());

    // An empty item set targets the whole order, picking up the item that
    // arrived after the first assignment.
    let late_item = orders
        .add_line_item(
            f.job_order_id,
            CreateLineItemRequest {
                equipment_id: None,
                item_type: "INSPECTION".to_string(),
                description: "Late addition".to_string(),
                quantity: 1,
            },
            f.admin.id,
        )
        .await
        .expect("add late line item");
    let swept = lifecycle
        .assign_line_items(f.job_order_id, f.inspector.id, &[], &f.admin, None)
        .await
        .expect("assign all");
    assert_eq!(swept.len(), 1);
    let late = orders
        .find_line_item(late_item.id)
        .await
        .expect("find late item")
        .expect("late item exists");
    assert_eq!(late.status, LineItemStatus::Assigned);

    // Plain inspectors cannot hand out work.
    let err = lifecycle
        .assign_line_items(f.job_order_id, f.inspector.id, &targets, &f.inspector, None)
        .await
        .expect_err("inspector bulk assign");
    assert!(matches!(err, LifecycleError::RoleDenied { .. }));

    // Every requested item must exist.
    let err = lifecycle
        .assign_line_items(f.job_order_id, f.inspector.id, &[i64::MAX], &f.admin, None)
        .await
        .expect_err("unknown line item");
    assert!(matches!(err, LifecycleError::NotFound { entity: "line item", .. }));

    // The assignee must be able to execute inspections; a portal account
    // is refused the same way a missing user is.
    let portal = create_user(&f.pool, Role::Client).await;
    let err = lifecycle
        .assign_line_items(f.job_order_id, portal.id, &targets, &f.admin, None)
        .await
        .expect_err("portal assignee");
    assert!(matches!(err, LifecycleError::NotFound { entity: "inspector", .. }));
}

// =========================================================================
// Concurrency and Guards
// =========================================================================

/// A stale version token loses: the second writer gets a conflict instead
/// of silently overwriting the first.
#[tokio::test]
#[ignore = "requires database"]
async fn test_stale_version_is_rejected() {
    let f = seed("").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());

    lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect("first assign");

    // Replaying with the stale token must fail.
    let err = lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect_err("stale assign");
    assert!(matches!(err, LifecycleError::VersionConflict { .. }));
}

/// Two approvers race on the same submitted inspection: one decision wins,
/// the other sees a version conflict.
#[tokio::test]
#[ignore = "requires database"]
async fn test_concurrent_decisions_conflict() {
    let f = seed("").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());

    lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect("assign");
    lifecycle
        .start(f.inspection_id, 2, &f.inspector, None)
        .await
        .expect("start");
    let i = lifecycle
        .submit(f.inspection_id, 3, &f.inspector, None)
        .await
        .expect("submit");

    let approve = lifecycle.approve(f.inspection_id, i.version, "ok", &f.approver, None);
    let reject = lifecycle.reject(
        f.inspection_id,
        i.version,
        "failed hook check",
        &f.approver,
        None,
    );
    let (a, r) = tokio::join!(approve, reject);

    // Exactly one of the two decisions lands.
    assert!(a.is_ok() != r.is_ok(), "one decision must win: {:?} / {:?}", a, r);
    let final_state = InspectionService::new(f.pool.clone())
        .find_by_id(f.inspection_id)
        .await
        .expect("find")
        .expect("exists");
    assert!(final_state.status.is_decided());
    assert_eq!(final_state.version, 5);
}

/// Rejection without an explanation is refused before any write happens.
#[tokio::test]
#[ignore = "requires database"]
async fn test_reject_requires_comment() {
    let f = seed("").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());

    lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect("assign");
    lifecycle
        .start(f.inspection_id, 2, &f.inspector, None)
        .await
        .expect("start");
    lifecycle
        .submit(f.inspection_id, 3, &f.inspector, None)
        .await
        .expect("submit");

    let err = lifecycle
        .reject(f.inspection_id, 4, "  ", &f.approver, None)
        .await
        .expect_err("empty comment");
    assert!(matches!(err, LifecycleError::MissingComment));

    let i = lifecycle
        .reject(f.inspection_id, 4, "Hook latch missing", &f.approver, None)
        .await
        .expect("reject with comment");
    assert_eq!(i.status, InspectionStatus::Rejected);
}

/// Role gates: an inspector cannot decide, a portal account cannot execute.
#[tokio::test]
#[ignore = "requires database"]
async fn test_role_gates() {
    let f = seed("").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());
    let portal = create_user(&f.pool, Role::Client).await;

    let err = lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &portal, None)
        .await
        .expect_err("portal assign");
    assert!(matches!(err, LifecycleError::RoleDenied { .. }));

    lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect("assign");
    lifecycle
        .start(f.inspection_id, 2, &f.inspector, None)
        .await
        .expect("start");
    lifecycle
        .submit(f.inspection_id, 3, &f.inspector, None)
        .await
        .expect("submit");

    let err = lifecycle
        .approve(f.inspection_id, 4, "", &f.inspector, None)
        .await
        .expect_err("inspector approve");
    assert!(matches!(err, LifecycleError::RoleDenied { .. }));
}

/// Answers are validated against the inspection's checklist template and
/// refused once execution is over.
#[tokio::test]
#[ignore = "requires database"]
async fn test_answer_validation() {
    let f = seed("lift_basic").await;
    let lifecycle = InspectionLifecycle::new(f.pool.clone());
    let registry = registry_with(lift_basic());

    lifecycle
        .assign(f.inspection_id, f.inspector.id, 1, &f.admin, None)
        .await
        .expect("assign");
    lifecycle
        .start(f.inspection_id, 2, &f.inspector, None)
        .await
        .expect("start");

    let err = lifecycle
        .record_answer(
            &registry,
            f.inspection_id,
            &RecordAnswerRequest {
                question_key: "not_in_template".to_string(),
                result: AnswerResult::Safe,
                comment: String::new(),
            },
        )
        .await
        .expect_err("unknown question");
    assert!(matches!(err, LifecycleError::UnknownQuestion { .. }));

    lifecycle
        .record_answer(
            &registry,
            f.inspection_id,
            &RecordAnswerRequest {
                question_key: "hook_ok".to_string(),
                result: AnswerResult::NotSafe,
                comment: "Latch bent".to_string(),
            },
        )
        .await
        .expect("valid answer");
    assert!(InspectionService::new(f.pool.clone())
        .has_unsafe_answer(f.inspection_id)
        .await
        .expect("check"));

    lifecycle
        .submit(f.inspection_id, 3, &f.inspector, None)
        .await
        .expect("submit");
    let err = lifecycle
        .record_answer(
            &registry,
            f.inspection_id,
            &RecordAnswerRequest {
                question_key: "rope_ok".to_string(),
                result: AnswerResult::Safe,
                comment: String::new(),
            },
        )
        .await
        .expect_err("answers after submit");
    assert!(matches!(err, LifecycleError::ExecutionClosed { .. }));
}

/// Publishing an order with no approved inspections is refused.
#[tokio::test]
#[ignore = "requires database"]
async fn test_publish_requires_approved_work() {
    let f = seed("").await;

    let err = PublicationLifecycle::new(f.pool.clone())
        .publish(f.job_order_id, "", &f.admin, None)
        .await
        .expect_err("premature publish");
    assert!(matches!(err, LifecycleError::NothingToPublish { .. }));
}

// =========================================================================
// Portal Scoping
// =========================================================================

/// Portal accounts see the orders of the client record sharing their
/// contact email; an unrelated portal account sees none of them.
#[tokio::test]
#[ignore = "requires database"]
async fn test_portal_scoping_follows_client_email() {
    let f = seed("").await;

    let order = JobOrderService::new(f.pool.clone())
        .find_by_id(f.job_order_id)
        .await
        .expect("find order")
        .expect("order exists");
    let client = ClientService::new(f.pool.clone())
        .find_by_id(order.client_id)
        .await
        .expect("find client")
        .expect("client exists");

    let portal = UserService::new(f.pool.clone())
        .create(CreateUserRequest {
            username: format!("portal-{}", uniq()),
            email: client.email.clone(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Client,
            competence: String::new(),
            phone: String::new(),
        })
        .await
        .expect("create portal user");

    let visible = JobOrderService::new(f.pool.clone())
        .list_for_client_user(portal.id)
        .await
        .expect("portal list");
    assert!(visible.iter().any(|o| o.id == f.job_order_id));

    let stranger = create_user(&f.pool, Role::Client).await;
    let visible = JobOrderService::new(f.pool.clone())
        .list_for_client_user(stranger.id)
        .await
        .expect("stranger list");
    assert!(visible.iter().all(|o| o.id != f.job_order_id));
}
