//! vfp-ui library - Validation Front Portal service
//!
//! Drives the progress table for freshly submitted batches (poll loop,
//! per-file state machine, row patches) and serves the aggregated outcome
//! report, both against an external validation backend.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use tokio::sync::Mutex;
use uuid::Uuid;

use vfp_common::config::PortalConfig;

pub mod api;
pub mod client;
pub mod report;
pub mod tracker;

use api::PatchBroadcaster;
use client::ValidationBackend;
use tracker::StopHandle;

/// Patches buffered per SSE client before a slow client starts lagging
const PATCH_BUFFER: usize = 100;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Validation backend the trackers and report handlers call
    pub backend: Arc<dyn ValidationBackend>,
    pub config: Arc<PortalConfig>,
    /// Row-patch fan-out to connected render-layer clients
    pub patches: PatchBroadcaster,
    /// Stop handles of the trackers currently polling, by batch id
    pub batches: Arc<Mutex<HashMap<Uuid, StopHandle>>>,
}

impl AppState {
    /// Create new application state
    pub fn new(backend: Arc<dyn ValidationBackend>, config: PortalConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            patches: PatchBroadcaster::new(PATCH_BUFFER),
            batches: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    Router::new()
        .route("/api/watch", post(api::post_watch))
        .route("/api/watch/:batch_id", delete(api::delete_watch))
        .route("/api/events", get(api::patch_stream))
        .route("/api/report/:token/:category", get(api::get_report_page))
        .route(
            "/api/report/:token/:category/export",
            get(api::export_group),
        )
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
