//! Keepalive HTTP listener.
//!
//! Hosting platforms health-check the process over HTTP; this tiny axum
//! router answers `/` and `/healthz`. It carries no bot state.

use axum::{Json, Router, routing::get};

use warhorn_core::error::{Result, WarhornError};

pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new()
        .route("/", get(health))
        .route("/healthz", get(health));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("keepalive listening on 0.0.0.0:{port} (/, /healthz)");
    axum::serve(listener, app)
        .await
        .map_err(|e| WarhornError::Other(format!("keepalive server failed: {e}")))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "warhorn",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
