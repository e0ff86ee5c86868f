//! Broadcast fan-out of change events to connected subscribers.
//!
//! Delivery is fire-and-forget: no acknowledgment, no replay for
//! subscribers that were disconnected when the event fired.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::services::stock::LowStockAlert;

#[derive(Debug, Clone, Serialize)]
pub struct SyncEvent {
    pub event: String,
    pub data: Value,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<SyncEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Notifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn emit(&self, event: &str, data: Value) {
        // No subscribers is not an error.
        let _ = self.tx.send(SyncEvent {
            event: event.to_string(),
            data,
        });
    }

    pub fn new_sale(&self, sale: Value) {
        self.emit("new-sale", sale);
    }

    pub fn product_updated(&self, product: Value) {
        self.emit("product-updated", product);
    }

    pub fn low_stock_alert(&self, alert: &LowStockAlert) {
        self.emit(
            "low-stock-alert",
            serde_json::to_value(alert).unwrap_or(Value::Null),
        );
    }

    pub fn new_deletion_request(&self, request: Value) {
        self.emit("new-deletion-request", request);
    }

    pub fn deletion_request_approved(&self, request: Value) {
        self.emit("deletion-request-approved", request);
    }

    pub fn deletion_request_rejected(&self, request: Value) {
        self.emit("deletion-request-rejected", request);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new()
    }
}
