//! Batch watch endpoints
//!
//! Registering a batch spawns its tracker task; the tracker's patches are
//! forwarded onto the SSE broadcast. Deleting the registration stops the
//! tracker cooperatively (the owning view was torn down).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use vfp_common::api::Token;

use crate::api::sse::PatchEvent;
use crate::tracker::{BatchRow, BatchTracker, TrackerOptions};
use crate::AppState;

/// POST /api/watch request body: parallel arrays of tokens and the render
/// layer's row identities, in display order
#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    pub tokens: Vec<String>,
    pub row_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub batch_id: Uuid,
}

/// POST /api/watch
pub async fn post_watch(
    State(state): State<AppState>,
    Json(request): Json<WatchRequest>,
) -> Result<Json<WatchResponse>, WatchError> {
    if request.tokens.len() != request.row_ids.len() {
        return Err(WatchError::BadRequest(format!(
            "{} tokens but {} row ids",
            request.tokens.len(),
            request.row_ids.len()
        )));
    }

    let mut batch = Vec::with_capacity(request.tokens.len());
    for (raw, row_id) in request.tokens.iter().zip(&request.row_ids) {
        let token = Token::new(raw.clone()).map_err(|e| WatchError::BadRequest(e.to_string()))?;
        batch.push(BatchRow {
            token,
            row_id: *row_id,
        });
    }

    let options = TrackerOptions {
        poll_interval: std::time::Duration::from_millis(state.config.poll_interval_ms),
        ..Default::default()
    };

    let (patch_tx, mut patch_rx) = mpsc::unbounded_channel();
    let (tracker, stop) = BatchTracker::new(state.backend.clone(), batch, patch_tx, options)
        .map_err(|e| WatchError::BadRequest(e.to_string()))?;

    let batch_id = Uuid::new_v4();
    state.batches.lock().await.insert(batch_id, stop);

    info!(batch_id = %batch_id, files = request.tokens.len(), "Watching new batch");

    tokio::spawn(tracker.run());

    // Forward patches onto the SSE broadcast; when the tracker finishes or
    // stops, drop the registration
    let broadcaster = state.patches.clone();
    let batches = state.batches.clone();
    tokio::spawn(async move {
        while let Some(patch) = patch_rx.recv().await {
            broadcaster.broadcast_lossy(PatchEvent { batch_id, patch });
        }
        batches.lock().await.remove(&batch_id);
        info!(batch_id = %batch_id, "Batch watch finished");
    });

    Ok(Json(WatchResponse { batch_id }))
}

/// DELETE /api/watch/:batch_id
pub async fn delete_watch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Result<StatusCode, WatchError> {
    let stop = state.batches.lock().await.remove(&batch_id);

    match stop {
        Some(stop) => {
            stop.stop();
            info!(batch_id = %batch_id, "Batch watch cancelled");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(WatchError::UnknownBatch(batch_id)),
    }
}

/// Watch API errors
#[derive(Debug)]
pub enum WatchError {
    BadRequest(String),
    UnknownBatch(Uuid),
}

impl IntoResponse for WatchError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WatchError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            WatchError::UnknownBatch(batch_id) => (
                StatusCode::NOT_FOUND,
                format!("unknown batch: {}", batch_id),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
