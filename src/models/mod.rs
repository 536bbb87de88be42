//! Data models module
//!
//! This module contains the domain entities used throughout the crate

pub mod event;
pub mod participant;

// Re-export commonly used models
pub use event::{
    CreateEventRequest, Event, FinalizeState, PromptState, TimeWindow, REVIEW_WINDOW_HOURS,
};
pub use participant::{CreateParticipantRequest, Participant, ParticipantStatus};
