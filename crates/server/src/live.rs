// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Live transfer notifications over WebSocket.
//!
//! Events are facts about ledger writes that already committed. They are
//! informational only: clients must still read the transfer over HTTP
//! before acting on it, and no commands are accepted over the socket.
//! Each client only receives events for requests it is a party to.

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use custody_api::{NotifyError, TransferNotifier};
use custody_domain::{AssetId, TransferId, TransferRequest, TransferStatus, UserId};
use futures::{SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::session::SessionUser;

/// Maximum number of events to buffer in the broadcast channel.
/// If clients cannot keep up, older events will be dropped.
const EVENT_BUFFER_SIZE: usize = 100;

/// Live event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A new pending request was stored.
    TransferRequested {
        transfer_id: TransferId,
        asset_id: AssetId,
        sender_id: UserId,
        receiver_id: UserId,
    },
    /// A request was accepted or rejected.
    TransferResolved {
        transfer_id: TransferId,
        asset_id: AssetId,
        sender_id: UserId,
        receiver_id: UserId,
        status: TransferStatus,
    },
    /// Connection confirmation (sent on initial connect).
    Connected {
        /// Server timestamp (ISO 8601).
        timestamp: String,
    },
}

impl LiveEvent {
    /// Returns true if the user should see this event.
    #[must_use]
    pub fn concerns(&self, user: UserId) -> bool {
        match self {
            Self::TransferRequested {
                sender_id,
                receiver_id,
                ..
            }
            | Self::TransferResolved {
                sender_id,
                receiver_id,
                ..
            } => *sender_id == user || *receiver_id == user,
            Self::Connected { .. } => true,
        }
    }
}

/// Broadcaster for live events.
#[derive(Clone)]
pub struct LiveEventBroadcaster {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveEventBroadcaster {
    /// Creates a new event broadcaster.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Broadcasts an event to all connected clients.
    ///
    /// If no clients are connected, the event is silently dropped.
    pub fn broadcast(&self, event: &LiveEvent) {
        match self.tx.send(event.clone()) {
            Ok(count) => {
                debug!(?event, receivers = count, "Broadcast live event");
            }
            Err(_) => {
                debug!(?event, "No receivers for live event");
            }
        }
    }

    /// Subscribes to the event stream.
    ///
    /// Events sent before subscription are not received.
    fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferNotifier for LiveEventBroadcaster {
    fn transfer_requested(&self, request: &TransferRequest) -> Result<(), NotifyError> {
        self.broadcast(&LiveEvent::TransferRequested {
            transfer_id: request.id(),
            asset_id: request.asset(),
            sender_id: request.sender(),
            receiver_id: request.receiver(),
        });
        Ok(())
    }

    fn transfer_resolved(&self, request: &TransferRequest) -> Result<(), NotifyError> {
        self.broadcast(&LiveEvent::TransferResolved {
            transfer_id: request.id(),
            asset_id: request.asset(),
            sender_id: request.sender(),
            receiver_id: request.receiver(),
            status: request.status(),
        });
        Ok(())
    }
}

/// Handler for GET `/live`.
///
/// Upgrades an authenticated connection and streams the caller's events.
pub async fn live_events_handler(
    ws: WebSocketUpgrade,
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
) -> Response {
    let broadcaster = app_state.live_broadcaster.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster, user.id))
}

/// Sends a connection confirmation, then streams events until the client
/// disconnects or an error occurs.
async fn handle_socket(
    socket: WebSocket,
    broadcaster: std::sync::Arc<LiveEventBroadcaster>,
    user: UserId,
) {
    info!(user_id = user.value(), "Client connected to live event stream");

    let (mut sender, mut receiver) = socket.split();
    let mut rx: broadcast::Receiver<LiveEvent> = broadcaster.subscribe();

    let connected_event = LiveEvent::Connected {
        timestamp: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .unwrap_or_else(|_| String::from("unknown")),
    };

    if let Ok(json) = serde_json::to_string(&connected_event)
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        warn!("Failed to send connection confirmation");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let event: LiveEvent = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live client lagging, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if !event.concerns(user) {
                continue;
            }
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to serialize live event");
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    warn!("Received unexpected message from client, ignoring");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed");
            send_task.abort();
        }
    }

    info!(user_id = user.value(), "Client disconnected from live event stream");
}
