//! Organizer review workflow scenarios: the one-shot roster prompt,
//! finalization, and the accept/refuse decisions.

mod helpers;

use assert_matches::assert_matches;
use helpers::{event_draft, TestContext, ORGANIZER};
use muster::database::ParticipantStore;
use muster::services::{OrganizerAction, OrganizerPrompt, UserNotification};
use muster::{MusterError, ParticipantStatus};

fn roster_prompts(ctx: &TestContext) -> Vec<OrganizerPrompt> {
    ctx.notifier
        .organizer_prompts()
        .into_iter()
        .filter(|(_, p)| matches!(p, OrganizerPrompt::ReviewRoster { .. }))
        .map(|(_, p)| p)
        .collect()
}

#[tokio::test]
async fn test_filling_far_future_event_prompts_once() {
    let ctx = TestContext::new();
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(2), Some(100), true), "Orga")
        .await
        .unwrap();

    // Second slot fills: one roster prompt with a Finalize action.
    ctx.services
        .validation
        .join_event(event.id, "a", "A")
        .await
        .unwrap();
    let prompts = roster_prompts(&ctx);
    assert_eq!(prompts.len(), 1);
    assert_matches!(
        &prompts[0],
        OrganizerPrompt::ReviewRoster { actions, .. }
            if actions == &vec![OrganizerAction::Finalize { event_id: event.id }]
    );

    // Churn afterwards never re-sends it.
    ctx.services
        .validation
        .join_event(event.id, "b", "B")
        .await
        .unwrap();
    ctx.services
        .validation
        .leave_event(event.id, "a")
        .await
        .unwrap();
    assert_eq!(roster_prompts(&ctx).len(), 1);
}

#[tokio::test]
async fn test_finalize_notifies_each_confirmed_once_and_locks_edits() {
    let ctx = TestContext::new();
    let mut event = ctx
        .services
        .events
        .create_event(event_draft(Some(4), Some(100), true), "Orga")
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

    let finalized = ctx
        .services
        .validation
        .finalize_step1(event.id, ORGANIZER)
        .await
        .unwrap();
    assert!(finalized.is_finalized());

    // Second press is an error, not a silent success, and notifies nobody.
    let err = ctx
        .services
        .validation
        .finalize_step1(event.id, ORGANIZER)
        .await
        .unwrap_err();
    assert_matches!(err, MusterError::EventAlreadyFinalized { .. });

    let mut finalize_notices: Vec<String> = ctx
        .notifier
        .user_notifications()
        .into_iter()
        .filter(|(_, n)| matches!(n, UserNotification::EventFinalized { .. }))
        .map(|(user, _)| user)
        .collect();
    finalize_notices.sort();
    assert_eq!(finalize_notices, vec!["a".to_string(), "b".to_string()]);

    // Calendar entry created for the scheduled event.
    assert_eq!(ctx.calendar.entries(), vec![event.id]);

    // Edits and the mode toggle are permanently rejected.
    event.title = "Renamed".to_string();
    assert_matches!(
        ctx.services.events.update_event(&event).await.unwrap_err(),
        MusterError::EventAlreadyFinalized { .. }
    );
    assert_matches!(
        ctx.services
            .events
            .set_waitlist_mode(event.id, ORGANIZER, false)
            .await
            .unwrap_err(),
        MusterError::EventAlreadyFinalized { .. }
    );
}

#[tokio::test]
async fn test_near_term_registration_review_accept_and_refuse() {
    let ctx = TestContext::new();
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(4), Some(30), true), "Orga")
        .await
        .unwrap();

    let a = ctx
        .services
        .validation
        .join_event(event.id, "a", "A")
        .await
        .unwrap();
    let b = ctx
        .services
        .validation
        .join_event(event.id, "b", "B")
        .await
        .unwrap();

    // Each near-term confirmed registration got its own review prompt.
    let review: Vec<_> = ctx
        .notifier
        .organizer_prompts()
        .into_iter()
        .filter(|(_, p)| matches!(p, OrganizerPrompt::NewRegistration { .. }))
        .collect();
    assert_eq!(review.len(), 2);

    // Refusing b deletes the row and revokes channel access.
    ctx.services
        .validation
        .refuse_candidate(b.id, ORGANIZER)
        .await
        .unwrap();
    assert!(ctx
        .store
        .find_by_event_and_user(event.id, "b")
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .access
        .revocations()
        .contains(&("priv-100".to_string(), "b".to_string())));

    // Accepting a keeps the confirmed slot and grants access.
    let (accepted, quota_increased) = ctx
        .services
        .validation
        .accept_candidate(a.id, ORGANIZER)
        .await
        .unwrap();
    assert_eq!(accepted.status, ParticipantStatus::Confirmed);
    assert!(!quota_increased);
    assert!(ctx
        .access
        .grants()
        .contains(&("priv-100".to_string(), "a".to_string())));
}

#[tokio::test]
async fn test_workflow_operations_require_organizer() {
    let ctx = TestContext::new();
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(4), Some(30), true), "Orga")
        .await
        .unwrap();
    let a = ctx
        .services
        .validation
        .join_event(event.id, "a", "A")
        .await
        .unwrap();

    assert_matches!(
        ctx.services
            .validation
            .finalize_step1(event.id, "a")
            .await
            .unwrap_err(),
        MusterError::NotOrganizer
    );
    assert_matches!(
        ctx.services
            .validation
            .accept_candidate(a.id, "a")
            .await
            .unwrap_err(),
        MusterError::NotOrganizer
    );
    assert_matches!(
        ctx.services
            .validation
            .refuse_candidate(a.id, "a")
            .await
            .unwrap_err(),
        MusterError::NotOrganizer
    );
}

#[tokio::test]
async fn test_manual_slot_freed_near_term_prompt_then_promote() {
    let ctx = TestContext::new();
    let event = ctx
        .services
        .events
        .create_event(event_draft(Some(2), Some(30), false), "Orga")
        .await
        .unwrap();

    // Fill the free slot directly, then queue a manual candidate.
    ctx.store.register(event.id, "a", "A", false).await.unwrap();
    let queued = ctx
        .services
        .validation
        .join_event(event.id, "q", "Q")
        .await
        .unwrap();
    assert_eq!(queued.status, ParticipantStatus::Waitlist);

    ctx.services
        .validation
        .leave_event(event.id, "a")
        .await
        .unwrap();

    let slot_freed: Vec<_> = ctx
        .notifier
        .organizer_prompts()
        .into_iter()
        .filter_map(|(_, p)| match p {
            OrganizerPrompt::SlotFreed { candidate, actions } => Some((candidate, actions)),
            _ => None,
        })
        .collect();
    assert_eq!(slot_freed.len(), 1);
    assert_eq!(slot_freed[0].0.id, queued.id);

    // The organizer takes the offer.
    let (promoted, quota_increased) = ctx
        .services
        .validation
        .promote_candidate(queued.id, ORGANIZER)
        .await
        .unwrap();
    assert_eq!(promoted.status, ParticipantStatus::Confirmed);
    assert!(!quota_increased);
}
