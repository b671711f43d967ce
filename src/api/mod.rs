//! REST API for a completed simulation run.
//!
//! Provides two GET endpoints:
//! - `/state`: scenario metadata, sim config, run summary, and latest step
//! - `/history`: step records with optional inclusive range filtering

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::ScenarioInfo;
use crate::sim::{RunSummary, SimConfig, StepRecord};

pub use types::{ErrorResponse, HistoryQuery, StateResponse};

/// Read-only application state shared across all request handlers.
///
/// Built once after the run completes and wrapped in `Arc`; no locks are
/// needed.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metadata of the scenario that was run.
    pub scenario: ScenarioInfo,
    /// Timing configuration of the run.
    pub config: SimConfig,
    /// Run-level summary.
    pub summary: RunSummary,
    /// Step history.
    pub history: Vec<StepRecord>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/history", get(handlers::get_history))
        .with_state(state)
}

/// Binds to `addr` and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
