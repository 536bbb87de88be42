//! Database module
//!
//! This module defines the persistence ports the services operate
//! against, plus the Postgres implementations and an in-memory store
//! used by the test suite. The ports expose the check-then-act
//! sequences (capacity decision, quota bump, one-shot marks) as single
//! atomic operations so concurrent triggers cannot interleave them.

pub mod connection;
pub mod memory;
pub mod repositories;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    CreateEventRequest, CreateParticipantRequest, Event, Participant, ParticipantStatus,
};
use crate::utils::errors::Result;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool, PoolConfig};
pub use memory::InMemoryStore;
pub use repositories::{PgEventRepository, PgParticipantRepository};

/// Persistence port for events.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, request: CreateEventRequest) -> Result<Event>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>>;

    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<Event>>;

    async fn find_by_private_channel_id(&self, channel_id: &str) -> Result<Option<Event>>;

    async fn find_by_creator(&self, creator_id: &str) -> Result<Vec<Event>>;

    async fn update(&self, event: &Event) -> Result<Event>;

    /// Delete an event; its participants are removed with it.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Events scheduled within the review window that still need the
    /// one-shot organizer prompt: in the future, prompt not sent, not
    /// finalized.
    async fn find_needing_validation_prompt(&self, now: DateTime<Utc>) -> Result<Vec<Event>>;

    /// Events whose scheduled time has passed without finalization.
    async fn find_started_unfinalized(&self, now: DateTime<Utc>) -> Result<Vec<Event>>;

    /// Conditionally record that the organizer prompt went out.
    ///
    /// Returns `true` iff this call transitioned the prompt state from
    /// `NotSent`; concurrent callers observe `false` and must not send.
    async fn mark_validation_prompt_sent(&self, id: i64, now: DateTime<Utc>) -> Result<bool>;

    /// Conditionally finalize. Returns `true` iff this call set it.
    async fn mark_finalized(&self, id: i64, now: DateTime<Utc>) -> Result<bool>;
}

/// Persistence port for participants.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Insert a participant with a caller-chosen status. Used for the
    /// organizer bootstrap at event creation.
    async fn create(&self, request: CreateParticipantRequest) -> Result<Participant>;

    /// Atomically decide CONFIRMED vs WAITLIST and insert.
    ///
    /// The capacity check and the insert run under one event-scoped
    /// lock: the row is waitlisted when `force_waitlist` holds or a
    /// bounded event is already full. `(event_id, user_id)` is unique;
    /// a duplicate surfaces as `ParticipantExists` with the existing
    /// row's status.
    async fn register(
        &self,
        event_id: i64,
        user_id: &str,
        username: &str,
        force_waitlist: bool,
    ) -> Result<Participant>;

    /// Atomically confirm a participant, raising a bounded `max_slots`
    /// by one when the event is already full. The returned flag reports
    /// whether the quota was bumped.
    async fn confirm_with_quota_bump(&self, participant_id: i64) -> Result<(Participant, bool)>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Participant>>;

    async fn find_by_event(&self, event_id: i64) -> Result<Vec<Participant>>;

    async fn find_by_event_and_user(
        &self,
        event_id: i64,
        user_id: &str,
    ) -> Result<Option<Participant>>;

    /// Participants with the given status, FIFO by join time.
    async fn find_by_event_and_status(
        &self,
        event_id: i64,
        status: ParticipantStatus,
    ) -> Result<Vec<Participant>>;

    async fn update(&self, participant: &Participant) -> Result<Participant>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn count_by_event_and_status(
        &self,
        event_id: i64,
        status: ParticipantStatus,
    ) -> Result<i64>;
}
