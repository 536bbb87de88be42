//! In-memory store
//!
//! A single-process implementation of [`EventStore`] and
//! [`ParticipantStore`] backed by one mutex, which makes the atomic
//! port primitives (capacity decision, quota bump, conditional marks)
//! trivially serializable. The test suite runs entirely against it;
//! it also serves adapters that want a database-free dry run.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::database::{EventStore, ParticipantStore};
use crate::models::{
    CreateEventRequest, CreateParticipantRequest, Event, FinalizeState, Participant,
    ParticipantStatus, PromptState, REVIEW_WINDOW_HOURS,
};
use crate::utils::errors::{MusterError, Result};

#[derive(Debug, Default)]
struct Inner {
    events: BTreeMap<i64, Event>,
    participants: BTreeMap<i64, Participant>,
    next_event_id: i64,
    next_participant_id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn fifo_sorted(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
    participants
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_event_id += 1;
        let now = Utc::now();
        let event = Event {
            id: inner.next_event_id,
            message_id: request.message_id,
            channel_id: request.channel_id,
            private_channel_id: request.private_channel_id,
            creator_id: request.creator_id,
            title: request.title,
            description: request.description,
            max_slots: request.max_slots,
            scheduled_at: request.scheduled_at,
            waitlist_auto: request.waitlist_auto,
            validation_prompt: PromptState::NotSent,
            finalization: FinalizeState::Open,
            created_at: now,
            updated_at: now,
        };
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.get(&id).cloned())
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .values()
            .find(|e| e.message_id.as_deref() == Some(message_id))
            .cloned())
    }

    async fn find_by_private_channel_id(&self, channel_id: &str) -> Result<Option<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .values()
            .find(|e| e.private_channel_id.as_deref() == Some(channel_id))
            .cloned())
    }

    async fn find_by_creator(&self, creator_id: &str) -> Result<Vec<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .values()
            .filter(|e| e.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn update(&self, event: &Event) -> Result<Event> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.events.contains_key(&event.id) {
            return Err(MusterError::EventNotFound { event_id: event.id });
        }
        let mut updated = event.clone();
        updated.updated_at = Utc::now();
        inner.events.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.events.remove(&id);
        inner.participants.retain(|_, p| p.event_id != id);
        Ok(())
    }

    async fn find_needing_validation_prompt(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let window = Duration::hours(REVIEW_WINDOW_HOURS);
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .values()
            .filter(|e| {
                matches!(e.validation_prompt, PromptState::NotSent)
                    && !e.is_finalized()
                    && e.scheduled_at
                        .map(|at| at > now && at - now <= window)
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn find_started_unfinalized(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .values()
            .filter(|e| {
                !e.is_finalized() && e.scheduled_at.map(|at| at <= now).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn mark_validation_prompt_sent(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .events
            .get_mut(&id)
            .ok_or(MusterError::EventNotFound { event_id: id })?;
        if event.validation_prompt.is_sent() {
            return Ok(false);
        }
        event.validation_prompt = PromptState::Sent(now);
        event.updated_at = now;
        Ok(true)
    }

    async fn mark_finalized(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .events
            .get_mut(&id)
            .ok_or(MusterError::EventNotFound { event_id: id })?;
        if event.is_finalized() {
            return Ok(false);
        }
        event.finalization = FinalizeState::Finalized(now);
        event.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl ParticipantStore for InMemoryStore {
    async fn create(&self, request: CreateParticipantRequest) -> Result<Participant> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .participants
            .values()
            .find(|p| p.event_id == request.event_id && p.user_id == request.user_id)
        {
            return Err(MusterError::ParticipantExists {
                status: existing.status,
            });
        }
        inner.next_participant_id += 1;
        let now = Utc::now();
        let participant = Participant {
            id: inner.next_participant_id,
            event_id: request.event_id,
            user_id: request.user_id,
            username: request.username,
            status: request.status,
            joined_at: request.joined_at,
            created_at: now,
            updated_at: now,
        };
        inner.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn register(
        &self,
        event_id: i64,
        user_id: &str,
        username: &str,
        force_waitlist: bool,
    ) -> Result<Participant> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .events
            .get(&event_id)
            .cloned()
            .ok_or(MusterError::EventNotFound { event_id })?;
        if let Some(existing) = inner
            .participants
            .values()
            .find(|p| p.event_id == event_id && p.user_id == user_id)
        {
            return Err(MusterError::ParticipantExists {
                status: existing.status,
            });
        }
        let confirmed = inner
            .participants
            .values()
            .filter(|p| p.event_id == event_id && p.status == ParticipantStatus::Confirmed)
            .count() as i64;
        let status = if force_waitlist || event.is_full(confirmed) {
            ParticipantStatus::Waitlist
        } else {
            ParticipantStatus::Confirmed
        };
        inner.next_participant_id += 1;
        let now = Utc::now();
        let participant = Participant {
            id: inner.next_participant_id,
            event_id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            status,
            joined_at: now,
            created_at: now,
            updated_at: now,
        };
        inner.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn confirm_with_quota_bump(&self, participant_id: i64) -> Result<(Participant, bool)> {
        let mut inner = self.inner.lock().unwrap();
        let participant = inner
            .participants
            .get(&participant_id)
            .cloned()
            .ok_or(MusterError::ParticipantNotFound)?;
        let event = inner
            .events
            .get(&participant.event_id)
            .cloned()
            .ok_or(MusterError::EventNotFound {
                event_id: participant.event_id,
            })?;
        let confirmed = inner
            .participants
            .values()
            .filter(|p| p.event_id == event.id && p.status == ParticipantStatus::Confirmed)
            .count() as i64;

        let now = Utc::now();
        let mut bumped = false;
        if event.is_full(confirmed) {
            let mut updated_event = event;
            updated_event.max_slots = Some(confirmed as i32 + 1);
            updated_event.updated_at = now;
            inner.events.insert(updated_event.id, updated_event);
            bumped = true;
        }

        let entry = inner.participants.get_mut(&participant_id).unwrap();
        entry.status = ParticipantStatus::Confirmed;
        entry.updated_at = now;
        Ok((entry.clone(), bumped))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Participant>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.participants.get(&id).cloned())
    }

    async fn find_by_event(&self, event_id: i64) -> Result<Vec<Participant>> {
        let inner = self.inner.lock().unwrap();
        Ok(fifo_sorted(
            inner
                .participants
                .values()
                .filter(|p| p.event_id == event_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_event_and_user(
        &self,
        event_id: i64,
        user_id: &str,
    ) -> Result<Option<Participant>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .participants
            .values()
            .find(|p| p.event_id == event_id && p.user_id == user_id)
            .cloned())
    }

    async fn find_by_event_and_status(
        &self,
        event_id: i64,
        status: ParticipantStatus,
    ) -> Result<Vec<Participant>> {
        let inner = self.inner.lock().unwrap();
        Ok(fifo_sorted(
            inner
                .participants
                .values()
                .filter(|p| p.event_id == event_id && p.status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn update(&self, participant: &Participant) -> Result<Participant> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.participants.contains_key(&participant.id) {
            return Err(MusterError::ParticipantNotFound);
        }
        let mut updated = participant.clone();
        updated.updated_at = Utc::now();
        inner.participants.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.participants.remove(&id);
        Ok(())
    }

    async fn count_by_event_and_status(
        &self,
        event_id: i64,
        status: ParticipantStatus,
    ) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .participants
            .values()
            .filter(|p| p.event_id == event_id && p.status == status)
            .count() as i64)
    }
}
