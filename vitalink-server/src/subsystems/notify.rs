//! Notification fan-out — per-patient push channels.
//!
//! Each patient id maps to a broadcast channel; clients subscribe to their
//! own channel over `GET /ws?token=...` after authenticating, and
//! clinician-initiated events (currently: a new prescription) are emitted to
//! the affected patient's channel. Delivery is best-effort and at-most-once:
//! no queue, no replay — if nobody is subscribed the message is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use vitalink_core::auth::verify_token;

use crate::http::HttpState;

/// Buffered messages per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    MedicationAdded {
        message: String,
        medication_id: Uuid,
    },
}

/// Registry of per-patient broadcast channels.
#[derive(Default)]
pub struct NotificationHub {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<Notification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a patient's channel, creating it if needed.
    pub fn subscribe(&self, patient_id: Uuid) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.lock().expect("hub lock poisoned");
        channels
            .entry(patient_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Emit to all clients currently subscribed to the patient's channel.
    /// Returns the number of receivers the message reached.
    pub fn emit(&self, patient_id: Uuid, notification: Notification) -> usize {
        let mut channels = self.channels.lock().expect("hub lock poisoned");
        let Some(sender) = channels.get(&patient_id) else {
            tracing::debug!(patient_id = %patient_id, "No channel for patient, notification dropped");
            return 0;
        };

        match sender.send(notification) {
            Ok(n) => n,
            Err(_) => {
                // Last subscriber is gone; reclaim the channel.
                channels.remove(&patient_id);
                0
            }
        }
    }
}

// ============================================================================
// WebSocket endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// Upgrade handler: authenticates the token from the query string and binds
/// the connection to the caller's own channel. The scoping key is the user id
/// inside the verified token, never anything client-supplied.
pub async fn ws_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match verify_token(&state.config.auth.secret(), &query.token) {
        Ok(u) => u,
        Err(e) => {
            tracing::debug!(error = %e, "WebSocket auth rejected");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub, user.id))
}

/// Forward hub messages to the client until either side closes.
async fn handle_socket(socket: WebSocket, hub: Arc<NotificationHub>, patient_id: Uuid) {
    let mut rx = hub.subscribe(patient_id);
    let (mut sender, mut receiver) = socket.split();

    let forward_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    let Ok(json) = serde_json::to_string(&notification) else {
                        continue;
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(patient_id = %patient_id, lagged = n, "Slow client, notifications dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Drain client frames; the push channel carries no client commands.
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    forward_task.abort();
    tracing::debug!(patient_id = %patient_id, "Notification socket closed");
}

// ============================================================================
// TESTS
// ============================================================================
