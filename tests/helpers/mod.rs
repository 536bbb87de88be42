//! Test helpers module
//!
//! Shared context for the integration tests: every scenario runs the
//! real service wiring over the in-memory store with recording ports.

// Not every test binary touches every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as TimeDelta, Utc};

use muster::database::InMemoryStore;
use muster::models::CreateEventRequest;
use muster::services::{
    RecordingAccessControl, RecordingCalendar, RecordingNotifier, ServiceFactory,
};

pub const ORGANIZER: &str = "organizer";

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub access: Arc<RecordingAccessControl>,
    pub calendar: Arc<RecordingCalendar>,
    pub services: ServiceFactory,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let access = Arc::new(RecordingAccessControl::new());
        let calendar = Arc::new(RecordingCalendar::new());
        let services = ServiceFactory::new(
            store.clone(),
            store.clone(),
            notifier.clone(),
            access.clone(),
            calendar.clone(),
            Duration::from_secs(600),
        );
        Self {
            store,
            notifier,
            access,
            calendar,
            services,
        }
    }
}

/// Event draft scheduled `hours_out` hours from now (or unscheduled).
pub fn event_draft(
    max_slots: Option<i32>,
    hours_out: Option<i64>,
    waitlist_auto: bool,
) -> CreateEventRequest {
    CreateEventRequest {
        message_id: Some("msg-100".to_string()),
        channel_id: Some("chan-100".to_string()),
        private_channel_id: Some("priv-100".to_string()),
        creator_id: ORGANIZER.to_string(),
        title: "Canyon expedition".to_string(),
        description: Some("Bring water".to_string()),
        max_slots,
        scheduled_at: hours_out.map(|h| Utc::now() + TimeDelta::hours(h)),
        waitlist_auto,
    }
}
