//! Sentinel API: REST surface over the device lifecycle core
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/devices", post(handlers::register_device).get(handlers::list_devices))
        .route("/devices/readings", get(handlers::device_readings))
        .route("/devices/:identity_key/compromise", post(handlers::compromise_device))
        .route("/devices/:identity_key/recover", post(handlers::recover_device))
        .route("/devices/:identity_key/remove", post(handlers::remove_device))
        .route("/assign-models", post(handlers::assign_models))
        .route("/ledger", get(handlers::get_ledger))
        .route("/ledger/verify", get(handlers::verify_ledger))
        .route("/archive", post(handlers::archive_ledger))
        .route("/metrics", get(handlers::health_metrics))
        .route("/metrics/prometheus", get(handlers::prometheus_metrics))
        .route("/network-topology", post(handlers::import_topology))
        .route("/network-topology/risk", post(handlers::classify_topology))
        .route("/health", get(handlers::health))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::in_memory(&config)?;
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    tracing::info!(
        addr = %config.addr,
        recovery_delay_min_ms = config.recovery_delay_min_ms,
        recovery_delay_max_ms = config.recovery_delay_max_ms,
        "Sentinel API listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
