//! Request-response chat endpoint.
//!
//! - `POST /v1/chat/:conversation_id` runs one exchange to completion and
//!   returns `{message_id, content, done: true}`.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;

use sb_domain::principal::Principal;
use sb_protocol::ClientMessage;

use crate::state::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(conversation_id): Path<String>,
    Json(body): Json<ClientMessage>,
) -> Response {
    let handle = match state
        .conversations
        .resolve(&conversation_id, &principal.id)
        .await
    {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(
                conversation_id = %conversation_id,
                principal_id = %principal.id,
                "message rejected: conversation not found or not owned"
            );
            return super::error_response(&e);
        }
    };

    tracing::info!(
        conversation_id = %conversation_id,
        principal_id = %principal.id,
        attachments = body.attachment_ids.len(),
        "sending message"
    );

    match state.pipeline.run_once(&handle, body).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            tracing::error!(
                conversation_id = %conversation_id,
                error = %e,
                "chat response failed"
            );
            super::error_response(&e)
        }
    }
}
