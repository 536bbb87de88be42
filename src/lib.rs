//! Muster
//!
//! Registration core for capacity-limited outings: confirmed slots and
//! a FIFO waitlist, automatic or organizer-decided promotion, and a
//! time-windowed organizer review workflow driven equally by human
//! actions and a background scheduler. Delivery platforms plug in
//! through narrow ports (persistence, notification, access grants,
//! calendar); the core holds the business rules and returns typed
//! domain errors for the adapter to render.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{MusterError, Result};

// Re-export main components for easy access
pub use database::{EventStore, InMemoryStore, ParticipantStore};
pub use models::{Event, Participant, ParticipantStatus, TimeWindow};
pub use services::{
    EventService, Notifier, RegistrarService, Scheduler, ServiceFactory, ValidationService,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
