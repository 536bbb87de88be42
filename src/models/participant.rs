//! Participant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration status of a participant.
///
/// The only legal transition is `Waitlist` -> `Confirmed` (a promotion);
/// a confirmed participant is never demoted back onto the waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Confirmed,
    Waitlist,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Confirmed => "confirmed",
            ParticipantStatus::Waitlist => "waitlist",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(ParticipantStatus::Confirmed),
            "waitlist" => Some(ParticipantStatus::Waitlist),
            _ => None,
        }
    }
}

/// A user's participation in an event.
///
/// Owned by its event: deleting the event cascades to its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub event_id: i64,
    pub user_id: String,
    pub username: String,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn is_confirmed(&self) -> bool {
        self.status == ParticipantStatus::Confirmed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParticipantRequest {
    pub event_id: i64,
    pub user_id: String,
    pub username: String,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
}
