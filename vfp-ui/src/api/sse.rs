//! SSE stream of row patches
//!
//! Every patch a tracker emits is fanned out to all connected render-layer
//! clients, tagged with the batch it belongs to.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::tracker::RowPatch;
use crate::AppState;

/// One broadcast row patch, tagged with its batch
#[derive(Debug, Clone, Serialize)]
pub struct PatchEvent {
    pub batch_id: Uuid,
    #[serde(flatten)]
    pub patch: RowPatch,
}

/// Fans row patches out to all connected SSE clients
#[derive(Clone)]
pub struct PatchBroadcaster {
    tx: broadcast::Sender<PatchEvent>,
}

impl PatchBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast a patch, ignoring if no clients are connected
    pub fn broadcast_lossy(&self, event: PatchEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of connected clients
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Create the event stream for a new client connection
    pub fn subscribe_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx);

        stream.filter_map(|result| async move {
            match result {
                Ok(patch_event) => {
                    let event = Event::default()
                        .event("row_patch")
                        .json_data(&patch_event)
                        .ok();
                    event.map(Ok)
                }
                Err(e) => {
                    // Lagging client skipped some patches; keep streaming
                    warn!("SSE client lagged: {:?}", e);
                    None
                }
            }
        })
    }
}

/// GET /api/events
pub async fn patch_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(
        clients = state.patches.client_count() + 1,
        "New SSE client connected"
    );

    Sse::new(state.patches.subscribe_stream()).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
