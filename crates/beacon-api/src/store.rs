//! `beacon-db` behind the dispatch workflow's storage ports.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_db::Database;
use beacon_dispatch::{HistoryStore, StoreError, UserDirectory};
use beacon_types::models::{SosEvent, User};
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;

pub struct DbStore {
    db: Arc<Database>,
}

impl DbStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DbStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.get_user(&user_id.to_string()))
            .await
            .map_err(|e| StoreError(format!("spawn_blocking join error: {}", e)))?
            .map_err(|e| StoreError(e.to_string()))
    }
}

#[async_trait]
impl HistoryStore for DbStore {
    async fn append_sos_event(&self, user_id: Uuid, event: &SosEvent) -> Result<(), StoreError> {
        let db = self.db.clone();
        let event = event.clone();
        tokio::task::spawn_blocking(move || db.append_sos_event(&user_id.to_string(), &event))
            .await
            .map_err(|e| StoreError(format!("spawn_blocking join error: {}", e)))?
            .map_err(|e| StoreError(e.to_string()))
    }
}

/// Run blocking DB work off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(format!("spawn_blocking join error: {}", e))
        })?
        .map_err(|e| ApiError::internal(format!("database error: {:#}", e)))
}
