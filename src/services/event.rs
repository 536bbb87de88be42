//! Event lifecycle service
//!
//! Creation (with the organizer bootstrap), guarded mutation, the
//! waitlist-mode toggle, and the lookups adapters need to resolve
//! platform references back to events.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::database::{EventStore, ParticipantStore};
use crate::models::{
    CreateEventRequest, CreateParticipantRequest, Event, Participant, ParticipantStatus,
};
use crate::utils::errors::{MusterError, Result};

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    participants: Arc<dyn ParticipantStore>,
}

impl EventService {
    pub fn new(events: Arc<dyn EventStore>, participants: Arc<dyn ParticipantStore>) -> Self {
        Self {
            events,
            participants,
        }
    }

    /// Create an event and register its organizer as a confirmed
    /// participant in the same step.
    ///
    /// The organizer row is part of the creation contract: if it cannot
    /// be written the error propagates so the caller sees the orphaned
    /// event instead of a silently organizer-less one.
    pub async fn create_event(
        &self,
        request: CreateEventRequest,
        creator_display_name: &str,
    ) -> Result<Event> {
        if let Some(at) = request.scheduled_at {
            if at <= Utc::now() {
                return Err(MusterError::DateTimeInPast);
            }
        }

        let event = self.events.create(request).await?;

        let username = creator_display_name.trim();
        let username = if username.is_empty() {
            event.creator_id.clone()
        } else {
            username.to_string()
        };
        self.participants
            .create(CreateParticipantRequest {
                event_id: event.id,
                user_id: event.creator_id.clone(),
                username,
                status: ParticipantStatus::Confirmed,
                joined_at: Utc::now(),
            })
            .await?;

        info!(event_id = event.id, creator_id = %event.creator_id, "Event created");
        Ok(event)
    }

    /// Persist an edited event.
    ///
    /// Rejected outright once finalized; a bounded `max_slots` may not
    /// fall below the current confirmed count; the schedule may not be
    /// moved into the past.
    pub async fn update_event(&self, event: &Event) -> Result<Event> {
        let stored = self
            .events
            .find_by_id(event.id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id: event.id })?;
        if stored.is_edit_locked() {
            return Err(MusterError::EventAlreadyFinalized { event_id: event.id });
        }

        if event.scheduled_at != stored.scheduled_at {
            if let Some(at) = event.scheduled_at {
                if at <= Utc::now() {
                    return Err(MusterError::DateTimeInPast);
                }
            }
        }

        if let Some(max) = event.max_slots {
            let confirmed = self
                .participants
                .count_by_event_and_status(event.id, ParticipantStatus::Confirmed)
                .await?;
            if confirmed > max as i64 {
                warn!(event_id = event.id, confirmed, max, "Slot reduction rejected");
                return Err(MusterError::CannotReduceSlots { confirmed });
            }
        }

        self.events.update(event).await
    }

    /// Switch between automatic and organizer-decided waitlist
    /// promotion. Organizer-only; locked once finalized.
    pub async fn set_waitlist_mode(
        &self,
        event_id: i64,
        requester_id: &str,
        auto: bool,
    ) -> Result<Event> {
        let mut event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id })?;
        if event.creator_id != requester_id {
            return Err(MusterError::NotOrganizer);
        }
        if event.is_edit_locked() {
            return Err(MusterError::EventAlreadyFinalized { event_id });
        }

        event.waitlist_auto = auto;
        let updated = self.events.update(&event).await?;
        info!(event_id, auto, "Waitlist mode changed");
        Ok(updated)
    }

    pub async fn event_by_id(&self, event_id: i64) -> Result<Option<Event>> {
        self.events.find_by_id(event_id).await
    }

    pub async fn event_by_message_id(&self, message_id: &str) -> Result<Option<Event>> {
        self.events.find_by_message_id(message_id).await
    }

    pub async fn event_by_private_channel_id(&self, channel_id: &str) -> Result<Option<Event>> {
        self.events.find_by_private_channel_id(channel_id).await
    }

    pub async fn events_by_creator(&self, creator_id: &str) -> Result<Vec<Event>> {
        self.events.find_by_creator(creator_id).await
    }

    pub async fn confirmed_participants(&self, event_id: i64) -> Result<Vec<Participant>> {
        self.participants
            .find_by_event_and_status(event_id, ParticipantStatus::Confirmed)
            .await
    }

    pub async fn waitlist_participants(&self, event_id: i64) -> Result<Vec<Participant>> {
        self.participants
            .find_by_event_and_status(event_id, ParticipantStatus::Waitlist)
            .await
    }

    pub async fn delete_event(&self, event_id: i64) -> Result<()> {
        self.events.delete(event_id).await
    }
}
