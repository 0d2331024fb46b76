//! Attachment upload.
//!
//! `POST /v1/uploads?filename=report.txt` stores the raw request body in
//! the blob store and returns its id for use in a chat message's
//! `attachment_ids`. Bodies above `attachments.max_upload_bytes` are
//! refused with 413.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use serde::Deserialize;

use sb_domain::principal::Principal;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    let max = state.config.attachments.max_upload_bytes;
    if body.len() > max {
        return super::error_json(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("file too large, maximum size: {max} bytes"),
        );
    }

    let filename = query.filename.unwrap_or_else(|| "upload".into());
    match state.blobs.put(&filename, &body).await {
        Ok(stored) => {
            tracing::info!(
                file_id = %stored.file_id,
                filename = %stored.filename,
                size = stored.size,
                principal_id = %principal.id,
                "file uploaded"
            );
            (StatusCode::CREATED, Json(stored)).into_response()
        }
        Err(e) => super::error_response(&e),
    }
}
