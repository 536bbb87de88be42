//! Services module
//!
//! This module contains the business logic services and the outbound
//! ports they call through.

pub mod access;
pub mod calendar;
pub mod event;
pub mod notification;
pub mod registrar;
pub mod scheduler;
pub mod validation;

// Re-export commonly used services
pub use access::{AccessControl, RecordingAccessControl};
pub use calendar::{CalendarSync, RecordingCalendar};
pub use event::EventService;
pub use notification::{
    Notifier, OrganizerAction, OrganizerPrompt, RecordingNotifier, UserNotification,
};
pub use registrar::RegistrarService;
pub use scheduler::{Scheduler, DEFAULT_TICK_INTERVAL};
pub use validation::ValidationService;

use std::sync::Arc;
use std::time::Duration;

use crate::database::{EventStore, ParticipantStore};

/// Wires the stores and outbound ports into the service set an adapter
/// works with.
#[derive(Clone)]
pub struct ServiceFactory {
    pub registrar: RegistrarService,
    pub events: EventService,
    pub validation: ValidationService,
    pub scheduler: Scheduler,
}

impl ServiceFactory {
    pub fn new(
        event_store: Arc<dyn EventStore>,
        participant_store: Arc<dyn ParticipantStore>,
        notifier: Arc<dyn Notifier>,
        access: Arc<dyn AccessControl>,
        calendar: Arc<dyn CalendarSync>,
        tick_interval: Duration,
    ) -> Self {
        let registrar = RegistrarService::new(event_store.clone(), participant_store.clone());
        let events = EventService::new(event_store.clone(), participant_store.clone());
        let validation = ValidationService::new(
            event_store,
            participant_store,
            registrar.clone(),
            notifier,
            access,
            calendar,
        );
        let scheduler = Scheduler::new(validation.clone(), tick_interval);

        Self {
            registrar,
            events,
            validation,
            scheduler,
        }
    }
}
