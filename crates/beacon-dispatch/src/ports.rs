//! Collaborators the workflow depends on.

use async_trait::async_trait;
use beacon_types::models::{SosEvent, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Failure reported by a storage collaborator. The text is for logs only.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The user with their current contact list, or `None` if unknown.
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one event to the user's history.
    async fn append_sos_event(&self, user_id: Uuid, event: &SosEvent) -> Result<(), StoreError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
