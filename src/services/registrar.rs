//! Registrar service
//!
//! Join/leave/promote/remove operations and the FIFO waitlist. The
//! registrar does not decide *policy* (whether a join must be forced
//! onto the waitlist is computed by the validation workflow and passed
//! in), it enforces capacity and ownership.

use std::sync::Arc;

use tracing::{debug, info};

use crate::database::{EventStore, ParticipantStore};
use crate::models::{Participant, ParticipantStatus};
use crate::utils::errors::{MusterError, Result};

#[derive(Clone)]
pub struct RegistrarService {
    events: Arc<dyn EventStore>,
    participants: Arc<dyn ParticipantStore>,
}

impl RegistrarService {
    pub fn new(events: Arc<dyn EventStore>, participants: Arc<dyn ParticipantStore>) -> Self {
        Self {
            events,
            participants,
        }
    }

    /// Register a user for an event.
    ///
    /// The status comes out of the store's atomic capacity check:
    /// WAITLIST when `force_waitlist` holds or a bounded event is full,
    /// CONFIRMED otherwise. A second join by the same user fails with
    /// `ParticipantExists` carrying the existing row's status.
    pub async fn join_event(
        &self,
        event_id: i64,
        user_id: &str,
        username: &str,
        force_waitlist: bool,
    ) -> Result<Participant> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id })?;

        if let Some(existing) = self
            .participants
            .find_by_event_and_user(event.id, user_id)
            .await?
        {
            debug!(event_id, user_id = %user_id, status = ?existing.status, "Duplicate join attempt");
            return Err(MusterError::ParticipantExists {
                status: existing.status,
            });
        }

        let participant = self
            .participants
            .register(event.id, user_id, username, force_waitlist)
            .await?;
        info!(
            event_id,
            user_id = %user_id,
            status = ?participant.status,
            "Participant registered"
        );
        Ok(participant)
    }

    /// Remove the caller's own registration. Returns whether the
    /// departing participant held a confirmed slot, so the caller can
    /// run slot-freed handling.
    pub async fn leave_event(&self, event_id: i64, user_id: &str) -> Result<bool> {
        let participant = self
            .participants
            .find_by_event_and_user(event_id, user_id)
            .await?
            .ok_or(MusterError::ParticipantNotFound)?;

        let was_confirmed = participant.is_confirmed();
        self.participants.delete(participant.id).await?;
        info!(event_id, user_id = %user_id, was_confirmed, "Participant left");
        Ok(was_confirmed)
    }

    /// Organizer-initiated promotion of a waitlisted participant.
    ///
    /// When the event is already full, the slot cap is raised by one in
    /// the same step (an explicit capacity override, reported through
    /// the returned flag).
    pub async fn promote_participant(
        &self,
        participant_id: i64,
        requester_id: &str,
    ) -> Result<(Participant, bool)> {
        let participant = self
            .participants
            .find_by_id(participant_id)
            .await?
            .ok_or(MusterError::ParticipantNotFound)?;
        if participant.status != ParticipantStatus::Waitlist {
            return Err(MusterError::ParticipantNotWaitlist { participant_id });
        }

        let event = self
            .events
            .find_by_id(participant.event_id)
            .await?
            .ok_or(MusterError::EventNotFound {
                event_id: participant.event_id,
            })?;
        if event.creator_id != requester_id {
            return Err(MusterError::NotOrganizer);
        }

        let (promoted, quota_increased) = self
            .participants
            .confirm_with_quota_bump(participant_id)
            .await?;
        info!(
            event_id = event.id,
            participant_id,
            quota_increased,
            "Participant promoted from waitlist"
        );
        Ok((promoted, quota_increased))
    }

    /// Organizer-initiated removal of a confirmed participant.
    /// Waitlisted candidates are refused through the validation
    /// workflow instead.
    pub async fn remove_participant(
        &self,
        participant_id: i64,
        requester_id: &str,
    ) -> Result<Participant> {
        let participant = self
            .participants
            .find_by_id(participant_id)
            .await?
            .ok_or(MusterError::ParticipantNotFound)?;

        let event = self
            .events
            .find_by_id(participant.event_id)
            .await?
            .ok_or(MusterError::EventNotFound {
                event_id: participant.event_id,
            })?;
        if event.creator_id != requester_id {
            return Err(MusterError::NotOrganizer);
        }
        if !participant.is_confirmed() {
            return Err(MusterError::ParticipantNotConfirmed { participant_id });
        }

        self.participants.delete(participant.id).await?;
        info!(event_id = event.id, participant_id, "Participant removed by organizer");
        Ok(participant)
    }

    /// Promote the longest-waiting participant (strict FIFO by join
    /// time). Building block for automatic slot-freed promotion.
    pub async fn next_waitlist_participant(&self, event_id: i64) -> Result<Participant> {
        let waitlist = self
            .participants
            .find_by_event_and_status(event_id, ParticipantStatus::Waitlist)
            .await?;
        let mut oldest = waitlist
            .into_iter()
            .next()
            .ok_or(MusterError::NoWaitlistParticipant)?;

        oldest.status = ParticipantStatus::Confirmed;
        let promoted = self.participants.update(&oldest).await?;
        info!(event_id, participant_id = promoted.id, "Waitlist head promoted");
        Ok(promoted)
    }

    /// Non-mutating peek at the waitlist head, for prompts that let the
    /// organizer decide.
    pub async fn oldest_waitlist_candidate(&self, event_id: i64) -> Result<Option<Participant>> {
        let waitlist = self
            .participants
            .find_by_event_and_status(event_id, ParticipantStatus::Waitlist)
            .await?;
        Ok(waitlist.into_iter().next())
    }
}
