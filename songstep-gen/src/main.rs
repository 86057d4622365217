//! songstep-gen - learning-step song generation service
//!
//! Serves the generation, persistence and asset endpoints over HTTP and
//! optionally the static UI bundle.

use anyhow::{Context, Result};
use clap::Parser;
use songstep_common::config::{ensure_directory_exists, TomlConfig};
use songstep_gen::config::{CliArgs, ServiceConfig};
use songstep_gen::services::HttpTransport;
use songstep_gen::{build_router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting songstep-gen v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ServiceConfig::from_sources(&args, &toml_config);
    config.log_credential_status();
    info!("Music provider: {}", config.music_base_url);

    ensure_directory_exists(&config.data_root)
        .with_context(|| format!("Failed to prepare data root {}", config.data_root.display()))?;
    info!("Data root: {}", config.data_root.display());

    let transport = HttpTransport::new(config.upstream_timeout)
        .context("Failed to build HTTP client")?;
    let addr = format!("{}:{}", config.bind_address, config.port);
    let state = AppState::new(config, Arc::new(transport))
        .context("Failed to initialize application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("songstep-gen listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("songstep-gen stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
