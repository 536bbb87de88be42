//! Notification port
//!
//! The workflow hands typed payloads to a delivery adapter through the
//! [`Notifier`] trait; rendering, localization, and button wiring all
//! happen on the adapter side. Organizer prompts carry the follow-up
//! [`OrganizerAction`]s the adapter routes back into the workflow.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Event, Participant};
use crate::utils::errors::Result;

/// Follow-up command attached to an organizer prompt. The adapter
/// renders these as interactive controls and calls the matching
/// workflow operation when one is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizerAction {
    Finalize { event_id: i64 },
    Accept { participant_id: i64 },
    Refuse { participant_id: i64 },
    Promote { participant_id: i64 },
    /// Acknowledge without changing anything. No workflow operation
    /// backs this; it exists so the adapter can render a decline.
    Ignore { participant_id: i64 },
}

/// Message to a single participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserNotification {
    EventFinalized {
        event_id: i64,
        title: String,
        scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    PromotedFromWaitlist {
        event_id: i64,
        title: String,
    },
    RegistrationAccepted {
        event_id: i64,
        title: String,
    },
    RegistrationRefused {
        event_id: i64,
        title: String,
    },
    RemovedByOrganizer {
        event_id: i64,
        title: String,
    },
}

/// Prompt asking the organizer for a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrganizerPrompt {
    /// One-shot roster review once a bounded event fills up (or the
    /// scheduler crosses the review window).
    ReviewRoster {
        confirmed: Vec<Participant>,
        waitlist: Vec<Participant>,
        actions: Vec<OrganizerAction>,
    },
    /// Per-participant review of a near-term confirmed registration.
    NewRegistration {
        participant: Participant,
        actions: Vec<OrganizerAction>,
    },
    /// A confirmed slot freed up; the oldest waitlisted candidate is
    /// offered for promotion.
    SlotFreed {
        candidate: Participant,
        actions: Vec<OrganizerAction>,
    },
}

/// Delivery port. Implementations must not call back into the core.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: &str, notification: UserNotification) -> Result<()>;

    async fn notify_organizer(&self, event: &Event, prompt: OrganizerPrompt) -> Result<()>;

    /// Re-render the event's public state (participant list, locked
    /// controls) after a transition.
    async fn refresh_event(&self, event: &Event) -> Result<()>;
}

/// Notifier that records every delivery instead of sending it.
///
/// Backs the test suite; also usable as a dry-run sink.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    user_notifications: Mutex<Vec<(String, UserNotification)>>,
    organizer_prompts: Mutex<Vec<(i64, OrganizerPrompt)>>,
    refreshed: Mutex<Vec<i64>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_notifications(&self) -> Vec<(String, UserNotification)> {
        self.user_notifications.lock().unwrap().clone()
    }

    pub fn organizer_prompts(&self) -> Vec<(i64, OrganizerPrompt)> {
        self.organizer_prompts.lock().unwrap().clone()
    }

    pub fn refreshed_events(&self) -> Vec<i64> {
        self.refreshed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_user(&self, user_id: &str, notification: UserNotification) -> Result<()> {
        self.user_notifications
            .lock()
            .unwrap()
            .push((user_id.to_string(), notification));
        Ok(())
    }

    async fn notify_organizer(&self, event: &Event, prompt: OrganizerPrompt) -> Result<()> {
        self.organizer_prompts.lock().unwrap().push((event.id, prompt));
        Ok(())
    }

    async fn refresh_event(&self, event: &Event) -> Result<()> {
        self.refreshed.lock().unwrap().push(event.id);
        Ok(())
    }
}
