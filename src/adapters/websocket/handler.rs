//! WebSocket upgrade handler for live chat connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Check the caller is the member the connection is for
//! 2. Upgrade to WebSocket
//! 3. Register the connection so notifications reach it
//! 4. Serve pings and room subscriptions until disconnect or idle timeout
//! 5. Leave every room channel and unregister

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::adapters::http::middleware::RequireMember;
use crate::domain::chat::MessageView;
use crate::domain::foundation::{ErrorCode, MemberId, RoomId};
use crate::ports::{ChatReader, ConnectionRegistry, LiveConnection, PushReceiver};

use super::messages::{ClientMessage, ServerMessage, SubscriptionMessage};
use super::rooms::RoomChannels;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub channels: Arc<RoomChannels>,
    /// Used to authorize room subscriptions.
    pub reader: Arc<dyn ChatReader>,
    pub push_buffer: usize,
    pub idle_timeout: Duration,
}

/// Handle WebSocket upgrade requests for a member's live connection.
///
/// Route: `GET /members/:member_id/live`
pub async fn ws_handler(
    RequireMember(caller): RequireMember,
    ws: WebSocketUpgrade,
    Path(member_id): Path<MemberId>,
    State(state): State<WebSocketState>,
) -> Response {
    if caller != member_id {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "errorCode": ErrorCode::Forbidden.to_string(),
                "message": "Cannot open a live connection for another member",
            })),
        )
            .into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, member_id, state))
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection. Every exit path goes through
/// the cleanup at the end.
async fn handle_socket(socket: WebSocket, member_id: MemberId, state: WebSocketState) {
    let (sink, mut stream) = socket.split();

    let (connection, push_rx) = LiveConnection::open(member_id, state.push_buffer);
    let connection_id = connection.id();
    if let Err(e) = state.registry.register(connection).await {
        tracing::error!(member_id = %member_id, error = %e, "failed to register live connection");
        return;
    }
    tracing::debug!(member_id = %member_id, connection_id = %connection_id, "live connection opened");

    let (out_tx, out_rx) = mpsc::channel(state.push_buffer.max(1));
    let mut writer = tokio::spawn(write_frames(sink, push_rx, out_rx));

    let mut session = LiveSession {
        member_id,
        reader: state.reader.clone(),
        channels: state.channels.clone(),
        out: out_tx,
        forwards: HashMap::new(),
    };
    session.send(ServerMessage::connected(member_id, connection_id)).await;

    loop {
        tokio::select! {
            _ = &mut writer => {
                tracing::debug!(connection_id = %connection_id, "writer finished, closing connection");
                break;
            }
            frame = tokio::time::timeout(state.idle_timeout, stream.next()) => match frame {
                Err(_) => {
                    tracing::debug!(connection_id = %connection_id, "idle timeout, closing connection");
                    break;
                }
                Ok(None) | Ok(Some(Ok(Message::Close(_)))) => break,
                Ok(Some(Err(e))) => {
                    tracing::debug!(connection_id = %connection_id, "receive error: {}", e);
                    break;
                }
                Ok(Some(Ok(Message::Text(text)))) => session.handle_text(&text).await,
                Ok(Some(Ok(Message::Binary(_)))) => {
                    tracing::warn!(connection_id = %connection_id, "received unsupported binary frame");
                }
                // Protocol pings are answered by axum; they still reset the idle timer.
                Ok(Some(Ok(_))) => {}
            }
        }
    }

    writer.abort();
    session.leave_all().await;
    if let Err(e) = state.registry.unregister(member_id, connection_id).await {
        tracing::warn!(connection_id = %connection_id, error = %e, "failed to unregister live connection");
    }
    tracing::debug!(member_id = %member_id, connection_id = %connection_id, "live connection closed");
}

/// Drains notifications and outbound frames into the socket.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut push_rx: PushReceiver,
    mut out_rx: mpsc::Receiver<ServerMessage>,
) {
    loop {
        let frame = tokio::select! {
            Some(notification) = push_rx.recv() => ServerMessage::notification(notification),
            Some(frame) = out_rx.recv() => frame,
            else => break,
        };
        if let Err(e) = send_message(&mut sink, &frame).await {
            tracing::debug!("send error, closing connection: {}", e);
            break;
        }
    }
}

/// Per-connection subscription state.
struct LiveSession {
    member_id: MemberId,
    reader: Arc<dyn ChatReader>,
    channels: Arc<RoomChannels>,
    out: mpsc::Sender<ServerMessage>,
    forwards: HashMap<RoomId, JoinHandle<()>>,
}

impl LiveSession {
    async fn handle_text(&mut self, text: &str) {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(_) => {
                self.send(ServerMessage::error(
                    ErrorCode::ValidationFailed.to_string(),
                    "Unrecognized frame",
                ))
                .await;
                return;
            }
        };

        match message {
            ClientMessage::Ping => self.send(ServerMessage::pong()).await,
            ClientMessage::Subscribe { room_id } => self.subscribe(room_id).await,
            ClientMessage::Unsubscribe { room_id } => {
                self.unsubscribe(room_id).await;
                self.send(ServerMessage::Unsubscribed(SubscriptionMessage { room_id }))
                    .await;
            }
        }
    }

    async fn subscribe(&mut self, room_id: RoomId) {
        match self.reader.find_participants(room_id, self.member_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.send(ServerMessage::error(
                    ErrorCode::Forbidden.to_string(),
                    format!("Not a participant of room {}", room_id),
                ))
                .await;
                return;
            }
            Err(e) => {
                tracing::error!(room_id = %room_id, error = %e, "failed to authorize room subscription");
                self.send(ServerMessage::error(
                    ErrorCode::InternalError.to_string(),
                    "Subscription failed",
                ))
                .await;
                return;
            }
        }

        if !self.forwards.contains_key(&room_id) {
            let rx = self.channels.subscribe(room_id).await;
            let forward = tokio::spawn(forward_room(rx, self.out.clone(), room_id));
            self.forwards.insert(room_id, forward);
        }
        self.send(ServerMessage::Subscribed(SubscriptionMessage { room_id }))
            .await;
    }

    async fn unsubscribe(&mut self, room_id: RoomId) {
        if let Some(forward) = self.forwards.remove(&room_id) {
            forward.abort();
            // Wait for the task to drop its receiver before releasing the room.
            let _ = forward.await;
            self.channels.release(room_id).await;
        }
    }

    async fn leave_all(&mut self) {
        let rooms: Vec<RoomId> = self.forwards.keys().copied().collect();
        for room_id in rooms {
            self.unsubscribe(room_id).await;
        }
    }

    async fn send(&self, frame: ServerMessage) {
        if self.out.send(frame).await.is_err() {
            tracing::debug!(member_id = %self.member_id, "outbound channel closed");
        }
    }
}

async fn forward_room(
    mut rx: broadcast::Receiver<MessageView>,
    out: mpsc::Sender<ServerMessage>,
    room_id: RoomId,
) {
    loop {
        match rx.recv().await {
            Ok(message) => {
                if out.send(ServerMessage::room_message(message)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(room_id = %room_id, skipped, "room subscriber lagged, messages skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sink.send(Message::Text(json)).await
}

/// Create axum router for the live endpoint.
pub fn websocket_router(state: WebSocketState) -> Router {
    Router::new()
        .route("/members/:member_id/live", get(ws_handler))
        .with_state(state)
}
