pub mod agents;
pub mod auth;
pub mod chat;
pub mod conversations;
pub mod health;
pub mod uploads;
pub mod ws;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;

use sb_domain::error::Error;

use crate::state::AppState;

/// The one message clients get for a bad credential, a missing
/// conversation and a conversation owned by someone else.
pub const ACCESS_DENIED: &str = "conversation not found";

/// Build the full API router.
///
/// Routes are split into **public** (no bearer token required) and
/// **protected** (gated behind the principal-resolving bearer middleware).
/// The chat WebSocket is public at the HTTP layer: it authenticates with
/// its `token` query parameter when the session is bound.
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.attachments.max_upload_bytes;

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/v1/chat/ws/:conversation_id", get(ws::chat_ws));

    let protected = Router::new()
        // Chat (request-response)
        .route("/v1/chat/:conversation_id", post(chat::send_message))
        // Responders
        .route("/v1/agents", get(agents::list_agents))
        // Conversations
        .route("/v1/conversations", post(conversations::create_conversation))
        .route(
            "/v1/conversations/:id/messages",
            get(conversations::list_messages),
        )
        .route("/v1/conversations/:id", delete(conversations::delete_conversation))
        // Attachments
        .route(
            "/v1/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Apply principal auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_principal,
        ));

    public.merge(protected)
}

pub(crate) fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Map a domain error onto the request-response surface.
pub(crate) fn error_response(err: &Error) -> Response {
    match err {
        Error::AuthFailure | Error::OwnershipFailure => {
            error_json(StatusCode::NOT_FOUND, ACCESS_DENIED)
        }
        Error::NotFound(_) => error_json(StatusCode::NOT_FOUND, err.to_string()),
        Error::Upstream { .. } | Error::MalformedResponse(_) | Error::Timeout(_) => {
            error_json(StatusCode::BAD_GATEWAY, err.to_string())
        }
        _ => error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}
