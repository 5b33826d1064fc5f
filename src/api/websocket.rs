// Real-time channel for device controllers
// New subscribers get a full snapshot, then status changes as they happen

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use super::server::AppState;
use crate::devices::Device;

/// Payload of an `UPDATE` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub status: bool,
}

/// Events pushed from the registry to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "INIT")]
    Init(Vec<Device>),
    #[serde(rename = "UPDATE")]
    Update(StatusUpdate),
}

impl ServerEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Frame sent by a subscriber. Only `esp_event` is recognised.
#[derive(Debug, Deserialize)]
struct ClientEvent {
    event: String,
    #[serde(default)]
    data: Value,
}

const ESP_EVENT: &str = "esp_event";

/// Connected subscriber entry
#[derive(Debug)]
pub struct Subscriber {
    pub tx: mpsc::UnboundedSender<Message>,
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

/// Registry of live subscribers, shared by every handler that publishes
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<u64, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, tx: mpsc::UnboundedSender<Message>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscriber = Subscriber {
            tx,
            connected_at: chrono::Utc::now(),
        };
        self.subscribers.write().await.insert(id, subscriber);
        id
    }

    pub async fn unregister(&self, id: u64) {
        if let Some(sub) = self.subscribers.write().await.remove(&id) {
            let connected_for = chrono::Utc::now() - sub.connected_at;
            tracing::debug!(
                subscriber_id = id,
                connected_secs = connected_for.num_seconds(),
                "Subscriber removed"
            );
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Push an event to every subscriber without waiting for delivery.
    ///
    /// Returns the number of subscribers the event was queued for. Closed
    /// channels are skipped; their sessions unregister themselves on exit.
    pub async fn publish(&self, event: &ServerEvent) -> usize {
        let json = match event.to_json() {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize broadcast event");
                return 0;
            },
        };

        let subscribers = self.subscribers.read().await;
        let delivered = subscribers
            .values()
            .filter(|sub| sub.tx.send(Message::Text(json.clone())).is_ok())
            .count();

        tracing::debug!(
            delivered,
            total = subscribers.len(),
            "Broadcast event to subscribers"
        );
        delivered
    }
}

/// Upgrade handler for `GET /ws`
pub async fn handle_device_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_device_socket(socket, state))
}

async fn handle_device_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Forward queued messages to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Snapshot and registration happen under the store read lock so no
    // UPDATE can slip in between INIT and joining the registry.
    let subscriber_id = {
        let store = state.store.read().await;
        match ServerEvent::Init(store.list()).to_json() {
            Ok(json) => {
                let _ = tx.send(Message::Text(json));
            },
            Err(e) => tracing::warn!(error = %e, "Failed to serialize INIT snapshot"),
        }
        state.subscribers.register(tx.clone()).await
    };

    tracing::info!(subscriber_id, "Subscriber connected");

    let heartbeat_tx = tx.clone();
    let heartbeat = state.heartbeat;
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(heartbeat);
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if heartbeat_tx.send(Message::Ping(Vec::new())).is_err() {
                break;
            }
            tracing::trace!(subscriber_id, "Sent heartbeat ping");
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_frame(subscriber_id, &text),
                Message::Pong(_) => {
                    tracing::trace!(subscriber_id, "Received pong");
                },
                Message::Close(_) => {
                    break;
                },
                _ => {},
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut heartbeat_task) => {
            send_task.abort();
            recv_task.abort();
        }
    }

    state.subscribers.unregister(subscriber_id).await;
    tracing::info!(subscriber_id, "Subscriber disconnected");
}

fn handle_client_frame(subscriber_id: u64, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent { event, data }) if event == ESP_EVENT => {
            tracing::info!(subscriber_id, payload = %data, "Received esp_event");
        },
        Ok(ClientEvent { event, .. }) => {
            tracing::debug!(subscriber_id, event = %event, "Ignoring unknown event");
        },
        Err(e) => {
            tracing::warn!(subscriber_id, error = %e, "Failed to parse subscriber message");
        },
    }
}
