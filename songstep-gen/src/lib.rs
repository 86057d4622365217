//! songstep-gen library
//!
//! Turns a learning goal into ordered steps, then produces lyrics, an
//! illustration and a song for each step through third-party providers.
//! Finished sessions are committed to a file-backed history.

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult, CoreError, CoreResult};

use services::{
    DefaultPrompts, GenerationOrchestrator, ProviderAdapter, SessionStore, UpstreamTransport,
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub provider: Arc<ProviderAdapter>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub store: Arc<SessionStore>,
    /// Service startup timestamp (for uptime reporting)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the provider, orchestrator and store around one transport
    pub fn new(config: ServiceConfig, transport: Arc<dyn UpstreamTransport>) -> CoreResult<Self> {
        let config = Arc::new(config);
        let provider = Arc::new(ProviderAdapter::new(config.clone(), transport.clone()));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            provider.clone(),
            Arc::new(DefaultPrompts),
        ));
        let store = Arc::new(SessionStore::new(&config.data_root, transport)?);

        Ok(Self {
            config,
            provider,
            orchestrator,
            store,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let mut router = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .merge(api::generation_routes())
        .merge(api::music_routes())
        .merge(api::content_routes())
        .merge(api::history_routes())
        .merge(api::asset_routes())
        .with_state(state);

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
