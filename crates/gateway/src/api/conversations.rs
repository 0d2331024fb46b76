//! Conversation endpoints, all scoped to the calling principal.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use serde::Deserialize;

use sb_domain::principal::Principal;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversation {
    #[serde(default)]
    pub title: Option<String>,
}

/// POST /v1/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Option<Json<CreateConversation>>,
) -> Response {
    let Json(body) = body.unwrap_or_default();
    match state.conversations.create(&principal.id, body.title).await {
        Ok(conversation) => {
            tracing::info!(
                conversation_id = %conversation.id,
                principal_id = %principal.id,
                "conversation created"
            );
            (StatusCode::CREATED, Json(conversation.summary())).into_response()
        }
        Err(e) => super::error_response(&e),
    }
}

/// GET /v1/conversations/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    match state.conversations.get_for_owner(&id, &principal.id).await {
        Ok(conversation) => Json(serde_json::json!({
            "conversation_id": conversation.id,
            "count": conversation.messages.len(),
            "messages": conversation.messages,
        }))
        .into_response(),
        Err(e) => super::error_response(&e),
    }
}

/// DELETE /v1/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    match state.conversations.delete(&id, &principal.id).await {
        Ok(()) => {
            tracing::info!(conversation_id = %id, principal_id = %principal.id, "conversation deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => super::error_response(&e),
    }
}
