use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::dtos::sale::SaleResponse;
use crate::dtos::sync::{AckResponse, BatchSyncSalesRequest, EnqueueRequest, ProcessQueueResponse};
use crate::error::AppError;
use crate::services::sales;
use crate::state::AppState;
use crate::sync::{self, Notifier, QueueStatus, SyncQueue, SyncQueueItem};

pub async fn queue_status(
    State(AppState { sync_queue, .. }): State<AppState>,
) -> Json<QueueStatus> {
    Json(sync_queue.status())
}

pub async fn process_queue(
    State(AppState { db_pool, sync_queue, notifier }): State<AppState>,
) -> Result<Json<ProcessQueueResponse>, AppError> {
    let outcome = sync::process_queue(&db_pool, sync_queue.as_ref(), &notifier).await;
    Ok(Json(ProcessQueueResponse {
        message: "Sync queue processed".to_string(),
        success: outcome.success,
        failed: outcome.failed,
    }))
}

pub async fn enqueue(
    State(AppState { sync_queue, .. }): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<AckResponse>, AppError> {
    let id = req.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    sync_queue.enqueue(SyncQueueItem::new(id.clone(), req.kind, req.payload));
    Ok(Json(AckResponse {
        message: format!("Item {} queued for sync", id),
    }))
}

pub async fn unsynced_sales(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<SaleResponse>>, AppError> {
    let sales = sales::list_unsynced(&db_pool).await?;
    Ok(Json(
        sales
            .into_iter()
            .map(|(sale, items)| SaleResponse::from_parts(sale, items))
            .collect(),
    ))
}

pub async fn batch_sync_sales(
    State(AppState { db_pool, notifier, .. }): State<AppState>,
    Json(req): Json<BatchSyncSalesRequest>,
) -> Result<Json<AckResponse>, AppError> {
    let updated = sync::batch_mark_synced(&db_pool, &notifier, &req.sale_ids).await?;
    Ok(Json(AckResponse {
        message: format!("{} sale(s) marked as synced", updated),
    }))
}

pub async fn clear_queue(
    State(AppState { sync_queue, .. }): State<AppState>,
) -> Json<AckResponse> {
    sync_queue.clear();
    Json(AckResponse {
        message: "Sync queue cleared".to_string(),
    })
}

/// WebSocket feed of broadcast events. Events fired while a client is
/// disconnected are not replayed.
pub async fn events(
    State(AppState { notifier, .. }): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| event_stream(socket, notifier))
}

async fn event_stream(mut socket: WebSocket, notifier: Notifier) {
    let mut rx = notifier.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event subscriber lagging; missed events are dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                // Broadcast only; any inbound frame other than a ping is ignored.
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}
