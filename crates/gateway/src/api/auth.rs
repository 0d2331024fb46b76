//! API authentication middleware.
//!
//! Every protected request must carry `Authorization: Bearer <token>`. The
//! token is verified by the configured [`sb_store::Authenticator`] and the
//! resulting [`Principal`] is attached to the request extensions for the
//! handlers to scope their lookups by.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

/// Extract the bearer token from an `Authorization` header value.
pub fn bearer_token(req: &Request<Body>) -> &str {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

/// Axum middleware that resolves the caller's principal on protected
/// routes. Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_principal(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(&req).to_owned();
    let principal = match state.auth.verify(&token).await {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "request rejected");
            return super::error_json(StatusCode::UNAUTHORIZED, "invalid or missing API token");
        }
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}
