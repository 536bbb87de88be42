//! Access-grant port
//!
//! Accepted and finalized participants get access to the event's
//! private channel; refused or removed ones lose it. Failures here are
//! logged by the workflow and never abort a state transition.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::utils::errors::Result;

#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn grant_access(&self, resource: &str, user_id: &str) -> Result<()>;

    async fn revoke_access(&self, resource: &str, user_id: &str) -> Result<()>;
}

/// Records grants and revocations instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingAccessControl {
    grants: Mutex<Vec<(String, String)>>,
    revocations: Mutex<Vec<(String, String)>>,
}

impl RecordingAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grants(&self) -> Vec<(String, String)> {
        self.grants.lock().unwrap().clone()
    }

    pub fn revocations(&self) -> Vec<(String, String)> {
        self.revocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessControl for RecordingAccessControl {
    async fn grant_access(&self, resource: &str, user_id: &str) -> Result<()> {
        self.grants
            .lock()
            .unwrap()
            .push((resource.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn revoke_access(&self, resource: &str, user_id: &str) -> Result<()> {
        self.revocations
            .lock()
            .unwrap()
            .push((resource.to_string(), user_id.to_string()));
        Ok(())
    }
}
