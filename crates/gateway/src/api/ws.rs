//! WebSocket endpoint for streamed chat.
//!
//! Flow:
//! 1. Client connects to `/v1/chat/ws/:conversation_id?token=<credential>`
//! 2. The session is bound; on failure the client gets one terminal error
//!    frame with empty metadata and the socket is closed
//! 3. Client sends `{content, attachment_ids}` frames; each one runs one
//!    exchange, answered by zero or more partial frames and exactly one
//!    terminal frame
//! 4. Exchanges run one at a time; frames that arrive meanwhile are queued
//!    in arrival order, and a close or socket error cancels the running
//!    exchange

use std::collections::VecDeque;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use sb_protocol::{ClientMessage, StreamFragment};

use crate::runtime::outbound;
use crate::state::AppState;

/// How long the writer may take to flush after the connection ends.
const WRITER_DRAIN: Duration = Duration::from_secs(5);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Query params
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Credential for the session principal.
    #[serde(default)]
    pub token: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /v1/chat/ws/:conversation_id: upgrade to WebSocket.
///
/// Authentication happens after the upgrade so that a rejected client
/// still receives a protocol frame explaining the rejection.
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let token = query.token.unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, state, conversation_id, token))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Socket handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_socket(socket: WebSocket, state: AppState, conversation_id: String, token: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // 1. Bind the session.
    let (outbound_tx, mut outbound_rx) = outbound::channel(state.config.chat.channel_capacity);
    let session = match state.sessions.bind(outbound_tx, &conversation_id, &token).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %e,
                "chat connection rejected"
            );
            let reason = if e.is_access_denied() {
                super::ACCESS_DENIED.to_string()
            } else {
                e.to_string()
            };
            let _ = send_frame(&mut ws_sink, &StreamFragment::rejected(reason)).await;
            let _ = ws_sink.send(Message::Close(None)).await;
            return;
        }
    };

    // 2. Writer task: forwards the session's frames to the socket. A failed
    //    write cancels the session.
    let writer_cancel = session.cancel_token().clone();
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if send_frame(&mut ws_sink, &frame).await.is_err() {
                writer_cancel.cancel();
                return;
            }
        }
        let _ = ws_sink.send(Message::Close(None)).await;
    });

    // 3. Reader loop: one exchange per inbound frame, in arrival order.
    let max_inbound = state.config.chat.max_inbound_bytes;
    let mut pending: VecDeque<String> = VecDeque::new();

    loop {
        if session.is_cancelled() {
            break;
        }
        let text = match pending.pop_front() {
            Some(text) => text,
            None => {
                let inbound = tokio::select! {
                    _ = session.cancel_token().cancelled() => break,
                    msg = ws_stream.next() => Inbound::from(msg),
                };
                match inbound {
                    Inbound::Text(text) => text,
                    Inbound::Closed => break,
                    Inbound::Skip => continue,
                }
            }
        };

        let request = match parse_request(&text, max_inbound) {
            Ok(r) => r,
            Err(reason) => {
                tracing::debug!(conversation_id = %conversation_id, reason = %reason, "inbound frame rejected");
                session.outbound().send(StreamFragment::rejected(reason)).await;
                continue;
            }
        };

        let exchange = state.sessions.dispatch(&session, request);
        tokio::pin!(exchange);
        let mut closed = false;
        loop {
            tokio::select! {
                _ = &mut exchange => break,
                msg = ws_stream.next(), if !closed => match Inbound::from(msg) {
                    Inbound::Text(text) => pending.push_back(text),
                    Inbound::Closed => {
                        closed = true;
                        session.cancel();
                    }
                    Inbound::Skip => {}
                },
            }
        }
        if closed {
            break;
        }
    }

    // 4. Cleanup: release the binding, let the writer flush, close.
    let displaced = !state.sessions.unbind(&session);
    let session_id = session.session_id.clone();
    drop(session);
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    tracing::info!(
        conversation_id = %conversation_id,
        session_id = %session_id,
        displaced,
        "chat connection closed"
    );
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

enum Inbound {
    Text(String),
    Closed,
    Skip,
}

impl From<Option<Result<Message, axum::Error>>> for Inbound {
    fn from(msg: Option<Result<Message, axum::Error>>) -> Self {
        match msg {
            Some(Ok(Message::Text(text))) => Inbound::Text(text),
            Some(Ok(Message::Binary(bytes))) => {
                Inbound::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            // axum answers pings itself.
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => Inbound::Skip,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => Inbound::Closed,
        }
    }
}

/// Validate one client frame.
fn parse_request(text: &str, max_bytes: usize) -> Result<ClientMessage, String> {
    if text.len() > max_bytes {
        return Err(format!("message exceeds {max_bytes} bytes"));
    }
    ClientMessage::from_json(text).map_err(|e| format!("invalid message: {e}"))
}

async fn send_frame(
    sink: &mut (impl SinkExt<Message> + Unpin),
    frame: &StreamFragment,
) -> Result<(), ()> {
    sink.send(Message::Text(frame.to_json())).await.map_err(|_| ())
}
