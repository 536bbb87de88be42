//! Error handling for Muster
//!
//! This module defines the main error type used throughout the crate.
//! Domain failures form a closed taxonomy so adapters can branch on the
//! variant and localize it; they never need to match on message text.

use thiserror::Error;

use crate::models::participant::ParticipantStatus;

/// Main error type for Muster operations
#[derive(Error, Debug)]
pub enum MusterError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification delivery error: {0}")]
    Delivery(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Scheduled time is in the past")]
    DateTimeInPast,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Participant is already registered")]
    ParticipantExists { status: ParticipantStatus },

    #[error("Participant {participant_id} is not on the waitlist")]
    ParticipantNotWaitlist { participant_id: i64 },

    #[error("Participant {participant_id} is not confirmed")]
    ParticipantNotConfirmed { participant_id: i64 },

    #[error("No participant on the waitlist")]
    NoWaitlistParticipant,

    #[error("Cannot reduce slots below the current confirmed count ({confirmed})")]
    CannotReduceSlots { confirmed: i64 },

    #[error("Only the organizer may perform this action")]
    NotOrganizer,

    #[error("Event {event_id} is already finalized")]
    EventAlreadyFinalized { event_id: i64 },
}

/// Result type alias for Muster operations
pub type Result<T> = std::result::Result<T, MusterError>;

impl MusterError {
    /// Whether the error belongs to the closed domain taxonomy that
    /// adapters render back to the acting user. Everything else is an
    /// infrastructure failure and should be propagated.
    pub fn is_user_error(&self) -> bool {
        match self {
            MusterError::Database(_) => false,
            MusterError::Migration(_) => false,
            MusterError::Config(_) => false,
            MusterError::Delivery(_) => false,
            MusterError::EventNotFound { .. } => true,
            MusterError::DateTimeInPast => true,
            MusterError::ParticipantNotFound => true,
            MusterError::ParticipantExists { .. } => true,
            MusterError::ParticipantNotWaitlist { .. } => true,
            MusterError::ParticipantNotConfirmed { .. } => true,
            MusterError::NoWaitlistParticipant => true,
            MusterError::CannotReduceSlots { .. } => true,
            MusterError::NotOrganizer => true,
            MusterError::EventAlreadyFinalized { .. } => true,
        }
    }
}
