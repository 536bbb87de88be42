//! Calendar port
//!
//! Finalizing a scheduled event creates an entry in the platform's
//! calendar. The entry is best-effort: a failure is logged, the
//! finalization stands.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::Event;
use crate::utils::errors::Result;

#[async_trait]
pub trait CalendarSync: Send + Sync {
    async fn create_entry(&self, event: &Event) -> Result<()>;
}

/// Records calendar entries instead of creating them.
#[derive(Debug, Default)]
pub struct RecordingCalendar {
    entries: Mutex<Vec<i64>>,
}

impl RecordingCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<i64> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarSync for RecordingCalendar {
    async fn create_entry(&self, event: &Event) -> Result<()> {
        self.entries.lock().unwrap().push(event.id);
        Ok(())
    }
}
