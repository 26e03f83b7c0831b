//! Liveness probe endpoint
//!
//! A trivial HTTP surface so the host platform can verify the binary is
//! deployable and alive. Performs no orchestration.

use anyhow::Result;
use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Liveness probe response
#[derive(Debug, Serialize)]
struct LivenessResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

async fn live() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Serve the probe until the process is stopped.
pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new().route("/health/live", get(live));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "liveness probe listening");

    axum::serve(listener, app).await?;
    Ok(())
}
