//! In-memory buffer for locally-originated mutations awaiting
//! re-delivery to the shared view.
//!
//! The queue is process-local and intentionally not persisted: a restart
//! loses unconfirmed items. Items that exhaust their retries stay queued
//! in a failed state and are only removed by an explicit clear.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery attempts before an item is parked as failed.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Sale,
    Product,
    Stock,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncQueueItem {
    pub id: String,
    pub kind: SyncKind,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub synced: bool,
    pub queued_at: DateTime<Utc>,
}

impl SyncQueueItem {
    pub fn new(id: impl Into<String>, kind: SyncKind, payload: serde_json::Value) -> Self {
        SyncQueueItem {
            id: id.into(),
            kind,
            payload,
            attempts: 0,
            synced: false,
            queued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub total: u64,
    pub pending: u64,
    pub synced: u64,
    pub failed: u64,
}

/// Swappable queue seam: callers only see enqueue/drain/status, so the
/// memory buffer can be replaced by a durable table or a broker without
/// touching them.
pub trait SyncQueue: Send + Sync {
    /// Idempotent on id: re-enqueueing overwrites the item and resets its
    /// retry state.
    fn enqueue(&self, item: SyncQueueItem);

    /// Snapshot of the items a sweep should attempt. Sweeps iterate this
    /// snapshot, never the live map, so items added mid-sweep are neither
    /// dropped nor double-processed.
    fn snapshot_pending(&self) -> Vec<SyncQueueItem>;

    /// Records a successful delivery and evicts the item.
    fn mark_synced(&self, id: &str);

    /// Records a failed delivery attempt, leaving the item queued.
    fn record_failure(&self, id: &str);

    fn status(&self) -> QueueStatus;

    fn clear(&self);
}

#[derive(Default)]
pub struct MemorySyncQueue {
    inner: Mutex<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    items: HashMap<String, SyncQueueItem>,
    /// Synced items are evicted, so successes are counted separately to
    /// keep `status()` honest.
    synced_total: u64,
}

impl MemorySyncQueue {
    pub fn new() -> Self {
        MemorySyncQueue::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().expect("sync queue mutex poisoned")
    }
}

impl SyncQueue for MemorySyncQueue {
    fn enqueue(&self, item: SyncQueueItem) {
        self.lock().items.insert(item.id.clone(), item);
    }

    fn snapshot_pending(&self) -> Vec<SyncQueueItem> {
        self.lock()
            .items
            .values()
            .filter(|item| !item.synced && item.attempts < MAX_ATTEMPTS)
            .cloned()
            .collect()
    }

    fn mark_synced(&self, id: &str) {
        let mut inner = self.lock();
        if inner.items.remove(id).is_some() {
            inner.synced_total += 1;
        }
    }

    fn record_failure(&self, id: &str) {
        if let Some(item) = self.lock().items.get_mut(id) {
            item.attempts += 1;
        }
    }

    fn status(&self) -> QueueStatus {
        let inner = self.lock();
        let pending = inner
            .items
            .values()
            .filter(|item| !item.synced && item.attempts < MAX_ATTEMPTS)
            .count() as u64;
        let failed = inner
            .items
            .values()
            .filter(|item| !item.synced && item.attempts >= MAX_ATTEMPTS)
            .count() as u64;

        QueueStatus {
            total: inner.items.len() as u64 + inner.synced_total,
            pending,
            synced: inner.synced_total,
            failed,
        }
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.items.clear();
        inner.synced_total = 0;
    }
}
