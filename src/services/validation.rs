//! Organizer validation workflow
//!
//! The review state machine around registrations. Behavior depends on
//! how close the event is to its start: far-future events get a single
//! roster-review prompt once they fill up, near-term events put every
//! new confirmed registration in front of the organizer, and started
//! events are edit-locked by the scheduler sweep. Human actions and
//! scheduler ticks funnel into the same operations here, so there is
//! exactly one set of transition rules.
//!
//! Outbound side effects (notifications, access grants, calendar
//! entries, embed refreshes) are best-effort: a port failure is logged
//! and never rolls back a committed state transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::database::{EventStore, ParticipantStore};
use crate::models::{Event, Participant, ParticipantStatus, TimeWindow};
use crate::services::access::AccessControl;
use crate::services::calendar::CalendarSync;
use crate::services::notification::{Notifier, OrganizerAction, OrganizerPrompt, UserNotification};
use crate::services::registrar::RegistrarService;
use crate::utils::errors::{MusterError, Result};

#[derive(Clone)]
pub struct ValidationService {
    events: Arc<dyn EventStore>,
    participants: Arc<dyn ParticipantStore>,
    registrar: RegistrarService,
    notifier: Arc<dyn Notifier>,
    access: Arc<dyn AccessControl>,
    calendar: Arc<dyn CalendarSync>,
}

impl ValidationService {
    pub fn new(
        events: Arc<dyn EventStore>,
        participants: Arc<dyn ParticipantStore>,
        registrar: RegistrarService,
        notifier: Arc<dyn Notifier>,
        access: Arc<dyn AccessControl>,
        calendar: Arc<dyn CalendarSync>,
    ) -> Self {
        Self {
            events,
            participants,
            registrar,
            notifier,
            access,
            calendar,
        }
    }

    /// Register a user, applying the waitlist policy and the
    /// window-dependent review hooks.
    ///
    /// In manual mode a join is forced onto the waitlist when the event
    /// is finalized, near its start, or already has a queue; the last
    /// clause keeps first-come-first-served ordering once any manual
    /// queue exists.
    pub async fn join_event(
        &self,
        event_id: i64,
        user_id: &str,
        username: &str,
    ) -> Result<Participant> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id })?;
        let now = Utc::now();
        let window = event.time_window(now);

        let force_waitlist = if event.waitlist_auto {
            false
        } else {
            let queued = self
                .participants
                .count_by_event_and_status(event.id, ParticipantStatus::Waitlist)
                .await?;
            event.is_finalized() || window == TimeWindow::Near || queued > 0
        };

        let participant = self
            .registrar
            .join_event(event_id, user_id, username, force_waitlist)
            .await?;

        // Joining a finalized event with a free slot confirms directly;
        // the locked roster already went out, so access follows at once.
        if event.is_finalized() && participant.is_confirmed() {
            self.grant(&event, &participant.user_id).await;
        }

        if participant.is_confirmed() {
            match window {
                TimeWindow::Near => {
                    let prompt = OrganizerPrompt::NewRegistration {
                        participant: participant.clone(),
                        actions: vec![
                            OrganizerAction::Accept {
                                participant_id: participant.id,
                            },
                            OrganizerAction::Refuse {
                                participant_id: participant.id,
                            },
                        ],
                    };
                    if let Err(err) = self.notifier.notify_organizer(&event, prompt).await {
                        warn!(event_id, error = %err, "Registration review prompt failed");
                    }
                }
                TimeWindow::FarFuture => {
                    if let Err(err) = self.capacity_review_hook(&event, now).await {
                        warn!(event_id, error = %err, "Capacity review prompt failed");
                    }
                }
                TimeWindow::Unscheduled | TimeWindow::Started => {}
            }
        }

        self.refresh(&event).await;
        Ok(participant)
    }

    /// Unregister a user; a freed confirmed slot triggers the
    /// promotion policy.
    pub async fn leave_event(&self, event_id: i64, user_id: &str) -> Result<bool> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id })?;

        let was_confirmed = self.registrar.leave_event(event_id, user_id).await?;
        if was_confirmed {
            self.handle_slot_freed(&event).await?;
        }

        self.refresh(&event).await;
        Ok(was_confirmed)
    }

    /// Organizer removes a confirmed participant; the freed slot goes
    /// through the same promotion policy as a leave.
    pub async fn remove_participant(
        &self,
        participant_id: i64,
        requester_id: &str,
    ) -> Result<Participant> {
        let removed = self
            .registrar
            .remove_participant(participant_id, requester_id)
            .await?;
        let event = self
            .events
            .find_by_id(removed.event_id)
            .await?
            .ok_or(MusterError::EventNotFound {
                event_id: removed.event_id,
            })?;

        self.revoke(&event, &removed.user_id).await;
        self.notify_user(
            &removed.user_id,
            UserNotification::RemovedByOrganizer {
                event_id: event.id,
                title: event.title.clone(),
            },
        )
        .await;

        self.handle_slot_freed(&event).await?;
        self.refresh(&event).await;
        Ok(removed)
    }

    /// Lock in the confirmed list (step 1 of organizer validation).
    ///
    /// Terminal: edits and the waitlist-mode toggle are rejected from
    /// here on. A second press fails with `EventAlreadyFinalized`
    /// rather than silently succeeding, so duplicate concurrent clicks
    /// notify nobody twice.
    pub async fn finalize_step1(&self, event_id: i64, requester_id: &str) -> Result<Event> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id })?;
        if event.creator_id != requester_id {
            return Err(MusterError::NotOrganizer);
        }

        let now = Utc::now();
        if !self.events.mark_finalized(event_id, now).await? {
            return Err(MusterError::EventAlreadyFinalized { event_id });
        }
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(MusterError::EventNotFound { event_id })?;
        info!(event_id, "Event finalized by organizer");

        let confirmed = self
            .participants
            .find_by_event_and_status(event_id, ParticipantStatus::Confirmed)
            .await?;
        for participant in confirmed.iter().filter(|p| p.user_id != event.creator_id) {
            self.notify_user(
                &participant.user_id,
                UserNotification::EventFinalized {
                    event_id,
                    title: event.title.clone(),
                    scheduled_at: event.scheduled_at,
                },
            )
            .await;
            self.grant(&event, &participant.user_id).await;
        }

        if event.scheduled_at.is_some() {
            if let Err(err) = self.calendar.create_entry(&event).await {
                warn!(event_id, error = %err, "Calendar entry creation failed");
            }
        }

        self.refresh(&event).await;
        Ok(event)
    }

    /// Organizer accepts a reviewed registration. A waitlisted
    /// candidate is promoted first (with quota-bump semantics); an
    /// already-confirmed one just gets the acknowledgement.
    pub async fn accept_candidate(
        &self,
        participant_id: i64,
        requester_id: &str,
    ) -> Result<(Participant, bool)> {
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

        let (participant, quota_increased) = if participant.status == ParticipantStatus::Waitlist {
            self.registrar
                .promote_participant(participant_id, requester_id)
                .await?
        } else {
            (participant, false)
        };

        self.notify_user(
            &participant.user_id,
            UserNotification::RegistrationAccepted {
                event_id: event.id,
                title: event.title.clone(),
            },
        )
        .await;
        self.grant(&event, &participant.user_id).await;

        self.refresh(&event).await;
        Ok((participant, quota_increased))
    }

    /// Organizer refuses a reviewed registration. The row is deleted
    /// whatever its status — waitlisted refusals come through here, not
    /// through `remove_participant`.
    pub async fn refuse_candidate(
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

        self.participants.delete(participant.id).await?;
        info!(event_id = event.id, participant_id, "Candidate refused");

        self.revoke(&event, &participant.user_id).await;
        self.notify_user(
            &participant.user_id,
            UserNotification::RegistrationRefused {
                event_id: event.id,
                title: event.title.clone(),
            },
        )
        .await;

        self.refresh(&event).await;
        Ok(participant)
    }

    /// Organizer promotes the offered waitlist candidate from a
    /// slot-freed prompt.
    pub async fn promote_candidate(
        &self,
        participant_id: i64,
        requester_id: &str,
    ) -> Result<(Participant, bool)> {
        let (promoted, quota_increased) = self
            .registrar
            .promote_participant(participant_id, requester_id)
            .await?;
        let event = self
            .events
            .find_by_id(promoted.event_id)
            .await?
            .ok_or(MusterError::EventNotFound {
                event_id: promoted.event_id,
            })?;

        self.notify_user(
            &promoted.user_id,
            UserNotification::PromotedFromWaitlist {
                event_id: event.id,
                title: event.title.clone(),
            },
        )
        .await;
        let window = event.time_window(Utc::now());
        if event.is_finalized() || window == TimeWindow::Near {
            self.grant(&event, &promoted.user_id).await;
        }

        self.refresh(&event).await;
        Ok((promoted, quota_increased))
    }

    /// Apply the waitlist policy after a confirmed slot freed up.
    ///
    /// Automatic mode promotes the FIFO head immediately. Manual mode
    /// leaves far-future events alone and, near the start, offers the
    /// organizer the oldest candidate; "Ignore" is a pure
    /// acknowledgement with no corresponding operation here.
    pub async fn handle_slot_freed(&self, event: &Event) -> Result<()> {
        let now = Utc::now();
        let window = event.time_window(now);

        if event.waitlist_auto {
            match self.registrar.next_waitlist_participant(event.id).await {
                Ok(promoted) => {
                    info!(event_id = event.id, participant_id = promoted.id, "Auto-promoted waitlist head");
                    self.notify_user(
                        &promoted.user_id,
                        UserNotification::PromotedFromWaitlist {
                            event_id: event.id,
                            title: event.title.clone(),
                        },
                    )
                    .await;
                    if event.is_finalized() || window == TimeWindow::Near {
                        self.grant(event, &promoted.user_id).await;
                    }
                }
                Err(MusterError::NoWaitlistParticipant) => {}
                Err(err) => return Err(err),
            }
            return Ok(());
        }

        if window == TimeWindow::Near {
            if let Some(candidate) = self.registrar.oldest_waitlist_candidate(event.id).await? {
                let prompt = OrganizerPrompt::SlotFreed {
                    candidate: candidate.clone(),
                    actions: vec![
                        OrganizerAction::Promote {
                            participant_id: candidate.id,
                        },
                        OrganizerAction::Ignore {
                            participant_id: candidate.id,
                        },
                    ],
                };
                if let Err(err) = self.notifier.notify_organizer(event, prompt).await {
                    warn!(event_id = event.id, error = %err, "Slot-freed prompt failed");
                }
            }
        }
        Ok(())
    }

    /// Sweep: send the review prompt to organizers of events crossing
    /// into the near window. Shares the one-shot sentinel with the
    /// reactive capacity hook, so whichever producer runs first wins.
    pub async fn process_validation_prompts(&self, now: DateTime<Utc>) -> Result<()> {
        let due = self.events.find_needing_validation_prompt(now).await?;
        for event in due {
            if let Err(err) = self.try_send_review_prompt(&event, now).await {
                error!(event_id = event.id, error = %err, "Review prompt sweep failed for event");
            }
        }
        Ok(())
    }

    /// Sweep: re-render started events that were never finalized so the
    /// locked edit controls are visible.
    pub async fn process_edit_lock(&self, now: DateTime<Utc>) -> Result<()> {
        let started = self.events.find_started_unfinalized(now).await?;
        for event in started {
            if let Err(err) = self.notifier.refresh_event(&event).await {
                error!(event_id = event.id, error = %err, "Edit-lock refresh failed for event");
            }
        }
        Ok(())
    }

    /// Far-future hook: first join that fills a bounded event sends the
    /// one-shot roster review prompt.
    async fn capacity_review_hook(&self, event: &Event, now: DateTime<Utc>) -> Result<()> {
        if event.max_slots.is_none() || event.validation_prompt.is_sent() {
            return Ok(());
        }
        let confirmed = self
            .participants
            .count_by_event_and_status(event.id, ParticipantStatus::Confirmed)
            .await?;
        if !event.is_full(confirmed) {
            return Ok(());
        }
        self.try_send_review_prompt(event, now).await
    }

    /// Mark-then-send: the conditional mark is the concurrency gate, so
    /// the prompt goes out at most once even with racing producers.
    async fn try_send_review_prompt(&self, event: &Event, now: DateTime<Utc>) -> Result<()> {
        if !self
            .events
            .mark_validation_prompt_sent(event.id, now)
            .await?
        {
            return Ok(());
        }

        let confirmed = self
            .participants
            .find_by_event_and_status(event.id, ParticipantStatus::Confirmed)
            .await?;
        let waitlist = self
            .participants
            .find_by_event_and_status(event.id, ParticipantStatus::Waitlist)
            .await?;
        let prompt = OrganizerPrompt::ReviewRoster {
            confirmed: confirmed
                .into_iter()
                .filter(|p| p.user_id != event.creator_id)
                .collect(),
            waitlist,
            actions: vec![OrganizerAction::Finalize { event_id: event.id }],
        };
        if let Err(err) = self.notifier.notify_organizer(event, prompt).await {
            // The sentinel is already set: at-most-once is the contract.
            warn!(event_id = event.id, error = %err, "Review prompt delivery failed");
        } else {
            info!(event_id = event.id, "Organizer review prompt sent");
        }
        Ok(())
    }

    async fn notify_user(&self, user_id: &str, notification: UserNotification) {
        if let Err(err) = self.notifier.notify_user(user_id, notification).await {
            warn!(user_id = %user_id, error = %err, "User notification failed");
        }
    }

    async fn grant(&self, event: &Event, user_id: &str) {
        if let Some(channel) = &event.private_channel_id {
            if let Err(err) = self.access.grant_access(channel, user_id).await {
                warn!(event_id = event.id, user_id = %user_id, error = %err, "Access grant failed");
            }
        }
    }

    async fn revoke(&self, event: &Event, user_id: &str) {
        if let Some(channel) = &event.private_channel_id {
            if let Err(err) = self.access.revoke_access(channel, user_id).await {
                warn!(event_id = event.id, user_id = %user_id, error = %err, "Access revocation failed");
            }
        }
    }

    async fn refresh(&self, event: &Event) {
        if let Err(err) = self.notifier.refresh_event(event).await {
            warn!(event_id = event.id, error = %err, "Event refresh failed");
        }
    }
}
