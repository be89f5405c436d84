//! vfp-ui (Validation Front Portal) - progress table and report service
//!
//! Polls the validation backend for batch progress, streams row patches to
//! the render layer, and serves paginated outcome reports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use vfp_common::config::{ConfigOverrides, PortalConfig};
use vfp_ui::client::{BackendClient, ValidationBackend};
use vfp_ui::{build_router, AppState};

#[derive(Parser)]
#[command(name = "vfp-ui", version, about = "Validation front portal service")]
struct Cli {
    /// Base URL of the validation backend
    #[arg(long)]
    backend_url: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Base poll period of batch trackers, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting VFP front portal (vfp-ui) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        backend_url: cli.backend_url,
        bind_port: cli.port,
        poll_interval_ms: cli.poll_interval_ms,
        config_file: cli.config,
    };
    let config = PortalConfig::resolve(&overrides);
    info!(
        backend_url = %config.backend_url,
        poll_interval_ms = config.poll_interval_ms,
        dedup_outcomes = config.dedup_outcomes,
        "Configuration resolved"
    );

    let backend: Arc<dyn ValidationBackend> =
        Arc::new(BackendClient::new(config.backend_url.as_str())?);

    let addr = format!("{}:{}", config.bind_host, config.bind_port);
    let state = AppState::new(backend, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("vfp-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
