//! AuthLatch HTTP Server - claim and query a shared, expiring authorization
//!
//! `POST /auth` records a claimant, `GET /auth` reports whether a claim is
//! still active. The state itself lives in [`authlatch_core::AuthorizationHolder`].

pub mod api;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod state;
pub mod tracing;

pub use api::{ClaimRequest, MessageResponse};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;

use anyhow::Context;
use authlatch_core::LatchConfig;
use axum::{routing::post, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(handlers::claim).get(handlers::query))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Run the server described by `config` until CTRL+C
///
/// Expects the global subscriber to be installed already (see
/// [`tracing::init_logging`]).
pub async fn run(config: LatchConfig) -> anyhow::Result<()> {
    ::tracing::info!("Starting AuthLatch server v{}", env!("CARGO_PKG_VERSION"));

    crate::metrics::init_prometheus(config.metrics_address)?;
    crate::metrics::init_metrics();

    let state = AppState::from_config(&config);
    ::tracing::info!(
        expiry_ms = config.auth_timeout.as_millis() as u64,
        expiry_mode = %config.expiry_mode,
        "Authorization holder ready"
    );

    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    ::tracing::info!("Server is running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    if config.otel_enabled {
        ::tracing::info!("Flushing OpenTelemetry traces...");
        crate::tracing::shutdown_telemetry();
    }

    ::tracing::debug!("Final metrics:\n{}", crate::metrics::get_prometheus_metrics());
    ::tracing::info!(
        "Server shutdown complete after {}s",
        state.uptime_seconds()
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        ::tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    ::tracing::info!("Received shutdown signal, shutting down gracefully...");
}
