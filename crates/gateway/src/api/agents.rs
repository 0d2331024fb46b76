use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// GET /v1/agents: every registered responder, sorted by name.
pub async fn list_agents(State(state): State<AppState>) -> impl IntoResponse {
    let agents = state.responders.list();
    Json(serde_json::json!({
        "count": agents.len(),
        "agents": agents,
    }))
}
