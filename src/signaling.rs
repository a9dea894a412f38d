//! # Signaling WebSocket Handler
//!
//! Room-based message relay for interview rooms. Clients connect to
//! `/ws/signaling`, join rooms, and exchange WebRTC negotiation payloads
//! (offer/answer/ICE) through the server. The server never inspects the
//! payloads; it only routes them.
//!
//! ## Protocol:
//! 1. **Connection**: each WebSocket connection gets a server-assigned id.
//! 2. **Rooms**: `join_room` / `leave_room` manage membership. Result
//!    broadcasts from the analysis endpoints arrive in the room named after
//!    the session id.
//! 3. **Relay**: `offer`, `answer`, and `ice_candidate` are forwarded to
//!    every other member of the room, tagged with the sender's id.
//! 4. **Termination**: `terminate_room` notifies the other members; room
//!    membership is left intact so the remaining peers can keep talking.
//!
//! Outbound delivery uses a per-connection unbounded channel registered with
//! the relay hub; the actor drains its receiver as a stream, so HTTP
//! handlers can broadcast into rooms without touching the actor system.

use crate::relay::RelayHub;
use crate::service::MonitorService;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Messages a client may send.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    Offer {
        room: String,
        payload: serde_json::Value,
    },
    Answer {
        room: String,
        payload: serde_json::Value,
    },
    IceCandidate {
        room: String,
        payload: serde_json::Value,
    },
    TerminateRoom {
        room: String,
    },
    Pong {
        timestamp: u64,
    },
}

/// Messages the server sends.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to the joiner only, confirming membership.
    RoomJoined { room: String, peer_count: usize },
    /// Sent to every room member (the joiner included) when someone joins.
    UserJoined { room: String, sid: String },
    /// Sent to remaining members when a peer leaves or disconnects.
    UserLeft { room: String, sid: String },
    Offer {
        room: String,
        from: String,
        payload: serde_json::Value,
    },
    Answer {
        room: String,
        from: String,
        payload: serde_json::Value,
    },
    IceCandidate {
        room: String,
        from: String,
        payload: serde_json::Value,
    },
    /// Sent to the other members; the sender already knows.
    RoomTerminated { room: String, from: String },
    Error { code: String, message: String },
    Ping { timestamp: u64 },
}

/// One signaling connection.
pub struct SignalingSocket {
    /// Server-assigned connection id, used as the peer id in relayed
    /// messages.
    conn_id: String,
    hub: Arc<RelayHub>,
    app_state: web::Data<AppState>,
    last_heartbeat: Instant,
}

impl SignalingSocket {
    pub fn new(hub: Arc<RelayHub>, app_state: web::Data<AppState>) -> Self {
        Self {
            conn_id: Uuid::new_v4().to_string(),
            hub,
            app_state,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_to_self(&self, ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMessage) {
        if let Ok(json) = serde_json::to_string(msg) {
            ctx.text(json);
        }
    }

    /// Serialize and broadcast to a room through the hub.
    fn broadcast(&self, room: &str, msg: &ServerMessage, excluding: Option<&str>) {
        match serde_json::to_string(msg) {
            Ok(json) => self.hub.broadcast(room, &json, excluding),
            Err(err) => error!("Failed to serialize relay message: {}", err),
        }
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, code: &str, message: &str) {
        self.send_to_self(
            ctx,
            &ServerMessage::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
        warn!(conn_id = %self.conn_id, "Signaling error {}: {}", code, message);
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::JoinRoom { room } => {
                self.hub.join(&room, &self.conn_id);
                let peer_count = self.hub.room_size(&room);
                info!(conn_id = %self.conn_id, room = %room, peer_count, "Peer joined room");

                self.send_to_self(
                    ctx,
                    &ServerMessage::RoomJoined {
                        room: room.clone(),
                        peer_count,
                    },
                );
                self.broadcast(
                    &room,
                    &ServerMessage::UserJoined {
                        room: room.clone(),
                        sid: self.conn_id.clone(),
                    },
                    None,
                );
            }
            ClientMessage::LeaveRoom { room } => {
                self.hub.leave(&room, &self.conn_id);
                info!(conn_id = %self.conn_id, room = %room, "Peer left room");

                self.broadcast(
                    &room,
                    &ServerMessage::UserLeft {
                        room: room.clone(),
                        sid: self.conn_id.clone(),
                    },
                    Some(&self.conn_id),
                );
            }
            ClientMessage::Offer { room, payload } => {
                self.broadcast(
                    &room,
                    &ServerMessage::Offer {
                        room: room.clone(),
                        from: self.conn_id.clone(),
                        payload,
                    },
                    Some(&self.conn_id),
                );
            }
            ClientMessage::Answer { room, payload } => {
                self.broadcast(
                    &room,
                    &ServerMessage::Answer {
                        room: room.clone(),
                        from: self.conn_id.clone(),
                        payload,
                    },
                    Some(&self.conn_id),
                );
            }
            ClientMessage::IceCandidate { room, payload } => {
                self.broadcast(
                    &room,
                    &ServerMessage::IceCandidate {
                        room: room.clone(),
                        from: self.conn_id.clone(),
                        payload,
                    },
                    Some(&self.conn_id),
                );
            }
            ClientMessage::TerminateRoom { room } => {
                info!(conn_id = %self.conn_id, room = %room, "Room terminated by peer");
                // Membership stays intact; clients decide what to do next.
                self.broadcast(
                    &room,
                    &ServerMessage::RoomTerminated {
                        room: room.clone(),
                        from: self.conn_id.clone(),
                    },
                    Some(&self.conn_id),
                );
            }
            ClientMessage::Pong { .. } => {
                self.last_heartbeat = Instant::now();
            }
        }
    }
}

impl Actor for SignalingSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "Signaling connection started");
        self.app_state.increment_active_connections();

        // Register with the hub and drain our delivery channel as a stream.
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.hub.connect(&self.conn_id, tx);
        ctx.add_stream(UnboundedReceiverStream::new(rx));

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %act.conn_id, "Signaling heartbeat timeout, closing connection");
                ctx.stop();
                return;
            }

            let ping = ServerMessage::Ping {
                timestamp: std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64,
            };
            if let Ok(json) = serde_json::to_string(&ping) {
                ctx.text(json);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let rooms = self.hub.disconnect(&self.conn_id);
        for room in rooms {
            self.broadcast(
                &room,
                &ServerMessage::UserLeft {
                    room: room.clone(),
                    sid: self.conn_id.clone(),
                },
                Some(&self.conn_id),
            );
        }
        self.app_state.decrement_active_connections();
        info!(conn_id = %self.conn_id, "Signaling connection stopped");
    }
}

/// Messages relayed to this connection through the hub.
impl StreamHandler<String> for SignalingSocket {
    fn handle(&mut self, msg: String, ctx: &mut Self::Context) {
        ctx.text(msg);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SignalingSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => self.handle_client_message(client_msg, ctx),
                Err(err) => {
                    self.send_error(ctx, "invalid_json", &format!("Invalid JSON: {}", err));
                }
            },
            Ok(ws::Message::Binary(_)) => {
                self.send_error(ctx, "unsupported", "Binary frames are not part of the protocol");
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(conn_id = %self.conn_id, "Signaling connection closed: {:?}", reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!("Signaling protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

/// HTTP endpoint that upgrades to a signaling WebSocket.
pub async fn signaling_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
    service: web::Data<MonitorService>,
) -> ActixResult<HttpResponse> {
    info!(
        "New signaling connection request from: {:?}",
        req.connection_info().peer_addr()
    );

    let socket = SignalingSocket::new(Arc::clone(service.hub()), app_state);
    ws::start(socket, &req, stream)
}
