//! End-to-end registration scenarios over the full service wiring.

mod helpers;

use assert_matches::assert_matches;
use helpers::{event_draft, TestContext, ORGANIZER};
use muster::{MusterError, ParticipantStatus};

#[tokio::test]
async fn test_capacity_flow_with_auto_promotion() {
    let ctx = TestContext::new();
    // MaxSlots = 2; the organizer is auto-confirmed (1/2).
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(2), Some(100), true), "Orga")
        .await
        .unwrap();

    // A joins -> CONFIRMED (2/2).
    let a = ctx
        .services
        .validation
        .join_event(event.id, "alice", "Alice")
        .await
        .unwrap();
    assert_eq!(a.status, ParticipantStatus::Confirmed);

    // B joins -> WAITLIST.
    let b = ctx
        .services
        .validation
        .join_event(event.id, "bob", "Bob")
        .await
        .unwrap();
    assert_eq!(b.status, ParticipantStatus::Waitlist);

    // A leaves a confirmed slot; auto mode promotes B.
    let was_confirmed = ctx
        .services
        .validation
        .leave_event(event.id, "alice")
        .await
        .unwrap();
    assert!(was_confirmed);

    let confirmed = ctx
        .services
        .events
        .confirmed_participants(event.id)
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 2);
    assert!(confirmed.iter().any(|p| p.user_id == "bob"));
    let waitlist = ctx
        .services
        .events
        .waitlist_participants(event.id)
        .await
        .unwrap();
    assert!(waitlist.is_empty());
}

#[tokio::test]
async fn test_manual_near_term_accept_without_quota_bump() {
    let ctx = TestContext::new();
    // Manual mode, event 30h away: joins are forced onto the waitlist.
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(2), Some(30), false), "Orga")
        .await
        .unwrap();

    let c = ctx
        .services
        .validation
        .join_event(event.id, "carol", "Carol")
        .await
        .unwrap();
    assert_eq!(c.status, ParticipantStatus::Waitlist);

    // One slot still free: accepting promotes without touching the cap.
    let (accepted, quota_increased) = ctx
        .services
        .validation
        .accept_candidate(c.id, ORGANIZER)
        .await
        .unwrap();
    assert_eq!(accepted.status, ParticipantStatus::Confirmed);
    assert!(!quota_increased);

    let stored = ctx
        .services
        .events
        .event_by_id(event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.max_slots, Some(2));
}

#[tokio::test]
async fn test_organizer_promotion_bumps_quota_when_full() {
    let ctx = TestContext::new();
    // MaxSlots = 3, filled to capacity.
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(3), Some(100), true), "Orga")
        .await
        .unwrap();
    ctx.services
        .validation
        .join_event(event.id, "a", "A")
        .await
        .unwrap();
    ctx.services
        .validation
        .join_event(event.id, "b", "B")
        .await
        .unwrap();
    let d = ctx
        .services
        .validation
        .join_event(event.id, "dora", "Dora")
        .await
        .unwrap();
    assert_eq!(d.status, ParticipantStatus::Waitlist);

    let (promoted, quota_increased) = ctx
        .services
        .registrar
        .promote_participant(d.id, ORGANIZER)
        .await
        .unwrap();
    assert_eq!(promoted.status, ParticipantStatus::Confirmed);
    assert!(quota_increased);

    let stored = ctx
        .services
        .events
        .event_by_id(event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.max_slots, Some(4));
}

#[tokio::test]
async fn test_duplicate_join_leaves_single_row() {
    let ctx = TestContext::new();
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(5), Some(100), true), "Orga")
        .await
        .unwrap();

    ctx.services
        .validation
        .join_event(event.id, "alice", "Alice")
        .await
        .unwrap();
    let err = ctx
        .services
        .validation
        .join_event(event.id, "alice", "Alice")
        .await
        .unwrap_err();
    assert_matches!(
        err,
        MusterError::ParticipantExists {
            status: ParticipantStatus::Confirmed
        }
    );

    let confirmed = ctx
        .services
        .events
        .confirmed_participants(event.id)
        .await
        .unwrap();
    assert_eq!(
        confirmed.iter().filter(|p| p.user_id == "alice").count(),
        1
    );
}

#[tokio::test]
async fn test_slot_reduction_guard_end_to_end() {
    let ctx = TestContext::new();
    let mut event = ctx
        .services
        .events
        .create_event(event_draft(Some(3), Some(100), true), "Orga")
        .await
        .unwrap();
    ctx.services
        .validation
        .join_event(event.id, "a", "A")
        .await
        .unwrap();

    // Organizer + one joiner confirmed; shrinking below 2 must fail.
    event.max_slots = Some(1);
    let err = ctx.services.events.update_event(&event).await.unwrap_err();
    assert_matches!(err, MusterError::CannotReduceSlots { confirmed: 2 });
}

#[tokio::test]
async fn test_capacity_invariant_holds_across_operations() {
    let ctx = TestContext::new();
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(2), Some(100), true), "Orga")
        .await
        .unwrap();

    for (user, name) in [("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")] {
        ctx.services
            .validation
            .join_event(event.id, user, name)
            .await
            .unwrap();
        let stored = ctx
            .services
            .events
            .event_by_id(event.id)
            .await
            .unwrap()
            .unwrap();
        let confirmed = ctx
            .services
            .events
            .confirmed_participants(event.id)
            .await
            .unwrap();
        assert!(confirmed.len() as i64 <= stored.max_slots.unwrap() as i64);
    }
}
