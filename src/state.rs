// src/state.rs
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::sync::{MemorySyncQueue, Notifier, SyncQueue};

/// Shared application state. The sync queue is injected behind a trait
/// so a durable backend can replace the memory buffer without touching
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub sync_queue: Arc<dyn SyncQueue>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        AppState::with_queue(db_pool, Arc::new(MemorySyncQueue::new()))
    }

    pub fn with_queue(db_pool: SqlitePool, sync_queue: Arc<dyn SyncQueue>) -> Self {
        AppState {
            db_pool,
            sync_queue,
            notifier: Notifier::new(),
        }
    }
}
