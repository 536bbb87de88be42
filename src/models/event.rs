//! Event model
//!
//! An event is a capacity-limited outing. `max_slots` bounds *confirmed*
//! participants only (the waitlist is unbounded); `None` means unlimited.
//! Two pieces of review state live on the event as explicit tagged enums:
//! whether the one-shot organizer review prompt went out, and whether the
//! organizer finalized the confirmed list.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How close to its start the organizer review window treats an event.
pub const REVIEW_WINDOW_HOURS: i64 = 48;

/// One-shot state of the organizer review prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptState {
    NotSent,
    Sent(DateTime<Utc>),
}

impl PromptState {
    pub fn is_sent(&self) -> bool {
        matches!(self, PromptState::Sent(_))
    }
}

/// Whether the organizer has locked in the confirmed list.
///
/// `Finalized` is terminal: event fields and the waitlist mode become
/// immutable once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizeState {
    Open,
    Finalized(DateTime<Utc>),
}

/// Position of an event relative to "now", classified once per operation
/// and threaded through the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// No scheduled time; all time-window behavior is disabled.
    Unscheduled,
    /// More than the review window away.
    FarFuture,
    /// Within the review window but not yet started.
    Near,
    /// Scheduled time has passed.
    Started,
}

/// An outing with bounded confirmed capacity and an unbounded waitlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    /// External message reference used by the delivery adapter.
    pub message_id: Option<String>,
    pub channel_id: Option<String>,
    /// Private channel whose access is granted on acceptance/finalization.
    pub private_channel_id: Option<String>,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Upper bound on confirmed participants; `None` = unlimited.
    pub max_slots: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// `true`: freed slots promote the waitlist head automatically;
    /// `false`: the organizer decides each promotion.
    pub waitlist_auto: bool,
    pub validation_prompt: PromptState,
    pub finalization: FinalizeState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_finalized(&self) -> bool {
        matches!(self.finalization, FinalizeState::Finalized(_))
    }

    /// Edits and the waitlist-mode toggle are rejected while this holds.
    pub fn is_edit_locked(&self) -> bool {
        self.is_finalized()
    }

    /// Classify the event's position relative to `now`.
    pub fn time_window(&self, now: DateTime<Utc>) -> TimeWindow {
        match self.scheduled_at {
            None => TimeWindow::Unscheduled,
            Some(at) if at <= now => TimeWindow::Started,
            Some(at) if at - now <= Duration::hours(REVIEW_WINDOW_HOURS) => TimeWindow::Near,
            Some(_) => TimeWindow::FarFuture,
        }
    }

    /// Whether `confirmed` fills every bounded slot.
    pub fn is_full(&self, confirmed: i64) -> bool {
        match self.max_slots {
            Some(max) => confirmed >= max as i64,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub message_id: Option<String>,
    pub channel_id: Option<String>,
    pub private_channel_id: Option<String>,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub max_slots: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub waitlist_auto: bool,
}
