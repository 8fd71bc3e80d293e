//! WebSocket endpoint for viewers.
//!
//! Each upgraded socket registers with the hub and then runs one loop that
//! multiplexes three sources:
//!
//! - the connection's outbox: one text frame per event, each write bounded
//!   by the write timeout
//! - inbound frames: anything the viewer sends is treated as keep-alive and
//!   discarded, a close or read error ends the connection
//! - a ping timer
//!
//! However the loop ends, the connection is unregistered from the hub.

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;
use fc_hub::{Outbound, Outbox};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};

use crate::state::{AppState, ConnectionSettings};

/// Why a viewer connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disconnect {
    /// The viewer closed the socket or it reached end of stream.
    ClientClosed,
    /// Reading from the socket failed.
    ReadFailed,
    /// A write failed.
    WriteFailed,
    /// A write did not complete within the write timeout.
    WriteTimedOut,
    /// The hub closed the connection during shutdown.
    ServerClosed,
    /// The hub dropped the connection after its queue stayed full past the
    /// backpressure grace.
    Dropped,
}

impl std::fmt::Display for Disconnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ClientClosed => "client closed",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::WriteTimedOut => "write timed out",
            Self::ServerClosed => "server closed",
            Self::Dropped => "dropped by hub",
        })
    }
}

/// `GET /ws`: upgrades to a WebSocket and streams file events.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut outbox = match state.hub.register() {
        Ok(outbox) => outbox,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting viewer");
            close(&mut socket, close_code::AWAY, "server shutting down", &state.settings).await;
            return;
        }
    };

    let conn_id = outbox.id();
    tracing::info!(conn_id = %conn_id, "Viewer connected");

    let reason = run_connection(&mut socket, &mut outbox, &state).await;

    match reason {
        Disconnect::ServerClosed => {
            close(&mut socket, close_code::AWAY, "server shutting down", &state.settings).await;
        }
        Disconnect::Dropped => {
            close(&mut socket, close_code::AGAIN, "too slow", &state.settings).await;
        }
        _ => {}
    }

    state.hub.unregister(conn_id);
    tracing::info!(conn_id = %conn_id, reason = %reason, "Viewer disconnected");
}

async fn run_connection(
    socket: &mut WebSocket,
    outbox: &mut Outbox,
    state: &AppState,
) -> Disconnect {
    let settings = state.settings;
    let mut ping = interval_at(Instant::now() + settings.ping_interval, settings.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = outbox.recv() => match message {
                Some(Outbound::Event(json)) => {
                    if let Err(reason) = send(socket, Message::Text(json.to_string()), &settings).await {
                        return reason;
                    }
                }
                Some(Outbound::Close) => return Disconnect::ServerClosed,
                None if state.hub.is_closed() => return Disconnect::ServerClosed,
                None => return Disconnect::Dropped,
            },

            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => return Disconnect::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %outbox.id(), error = %e, "Socket read failed");
                    return Disconnect::ReadFailed;
                }
            },

            _ = ping.tick() => {
                if let Err(reason) = send(socket, Message::Ping(Vec::new()), &settings).await {
                    return reason;
                }
            }

            () = state.shutdown.cancelled() => return Disconnect::ServerClosed,
        }
    }
}

async fn send(
    socket: &mut WebSocket,
    message: Message,
    settings: &ConnectionSettings,
) -> Result<(), Disconnect> {
    match timeout(settings.write_timeout, socket.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Socket write failed");
            Err(Disconnect::WriteFailed)
        }
        Err(_) => Err(Disconnect::WriteTimedOut),
    }
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str, settings: &ConnectionSettings) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = send(socket, Message::Close(Some(frame)), settings).await;
}
