mod test_support;

use insightclass_console::alerts::{
    resolve_keyword_scope, validate_report_reason, AlertBoard, AlertWorkflow, WorkflowError,
    MAX_REPORT_REASON_LEN,
};
use insightclass_console::forms::normalize_keyword;
use insightclass_console::model::TargetKind;
use insightclass_console::ApiClient;
use test_support::{admin, directory_fixture, event, manager, resolved, student, triggered};

#[test]
fn already_flagged_event_cannot_be_reported_again() {
    let flagged = triggered(event(1, "s1", TargetKind::User, "t1", Some("negativo")));
    let err = validate_report_reason(&flagged, "comportamento preocupante").unwrap_err();
    assert_eq!(err.field, "reason");
    assert!(err.message.contains("já está marcado"));
}

#[test]
fn report_reason_must_be_substantive() {
    let fb = event(1, "s1", TargetKind::User, "t1", None);

    assert!(validate_report_reason(&fb, "   ab  ").is_err());
    assert!(validate_report_reason(&fb, "").is_err());

    let ok = validate_report_reason(&fb, "  aluno relatou ameaça  ").expect("valid reason");
    assert_eq!(ok, "aluno relatou ameaça");
}

#[test]
fn report_reason_is_truncated_not_rejected() {
    let fb = event(1, "s1", TargetKind::User, "t1", None);
    let long = "x".repeat(MAX_REPORT_REASON_LEN + 50);
    let kept = validate_report_reason(&fb, &long).expect("long reason accepted");
    assert_eq!(kept.chars().count(), MAX_REPORT_REASON_LEN);
}

#[test]
fn keyword_scope_follows_the_viewer_role() {
    // Admins choose freely, including the network-wide scope.
    assert_eq!(resolve_keyword_scope(&admin("adm1"), None).unwrap(), None);
    assert_eq!(
        resolve_keyword_scope(&admin("adm1"), Some(2)).unwrap(),
        Some(2)
    );

    // Managers are pinned to their own institution.
    let g = manager("g1", 1);
    assert_eq!(resolve_keyword_scope(&g, None).unwrap(), Some(1));
    assert_eq!(resolve_keyword_scope(&g, Some(1)).unwrap(), Some(1));

    // A conflicting request is refused, never silently corrected.
    assert!(resolve_keyword_scope(&g, Some(2)).is_err());

    // Other roles never manage keywords.
    assert!(resolve_keyword_scope(&student("s1", 1, 100), None).is_err());
}

#[test]
fn keywords_are_trimmed_lowercased_and_length_checked() {
    assert_eq!(normalize_keyword("  BULLYING  ").unwrap(), "bullying");
    assert!(normalize_keyword("a").is_err());
    assert!(normalize_keyword("   ").is_err());
    assert!(normalize_keyword(&"k".repeat(200)).is_err());
}

#[test]
fn board_membership_drives_resolution_eligibility() {
    let board = AlertBoard {
        active: vec![triggered(event(1, "s1", TargetKind::User, "t1", None))],
        resolved: vec![resolved(event(2, "s1", TargetKind::User, "t1", None))],
    };
    assert!(board.is_active(1));
    assert!(!board.is_active(2));
    assert!(!board.is_active(99));
}

#[tokio::test]
async fn resolving_outside_the_active_projection_is_rejected_locally() {
    // The guard runs before any remote call, so the client address is
    // never contacted here.
    let api = ApiClient::new("http://127.0.0.1:9/api/v1");
    let workflow = AlertWorkflow::new(&api);
    let board = AlertBoard {
        active: vec![triggered(event(1, "s1", TargetKind::User, "t1", None))],
        resolved: vec![resolved(event(2, "s1", TargetKind::User, "t1", None))],
    };

    // An already-resolved event never transitions back through resolve.
    let err = workflow.resolve(&board, 2, Some("nota")).await.unwrap_err();
    match err {
        WorkflowError::Rejected(field) => {
            assert_eq!(field.field, "feedback_id");
            assert!(field.message.contains("resolvido"));
        }
        other => panic!("expected a local rejection, got {other:?}"),
    }

    // Same for an id the board never held.
    assert!(matches!(
        workflow.resolve(&board, 99, None).await,
        Err(WorkflowError::Rejected(_))
    ));
}

#[test]
fn scoped_board_keeps_only_events_touching_the_school() {
    let directory = directory_fixture();
    // s1/t1 live in school 1; t2 lives in school 2.
    let board = AlertBoard {
        active: vec![
            triggered(event(1, "s1", TargetKind::User, "t1", Some("negativo"))),
            triggered(event(2, "t2", TargetKind::Class, "200", None)),
        ],
        resolved: vec![resolved(event(3, "t2", TargetKind::User, "s1", None))],
    };

    let scoped = board.scoped_to(1, &directory);
    assert_eq!(scoped.active.len(), 1);
    assert_eq!(scoped.active[0].id, 1);
    // Event 3 targets a school-1 student, so it stays.
    assert_eq!(scoped.resolved.len(), 1);
    assert_eq!(scoped.resolved[0].id, 3);
}
