// ABOUTME: HTTP surface for the exporter: scrape and health endpoints
// ABOUTME: Axum router with per-scrape deadline enforcement and graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use http::header;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collector::GlucoseCollector;
use crate::exposition;
use crate::librelink::GlucoseSource;

/// Shared state handed to the request handlers
pub struct AppState<S> {
    collector: GlucoseCollector<S>,
    scrape_timeout: Duration,
}

impl<S: GlucoseSource> AppState<S> {
    /// Bundle the collector with its per-scrape deadline
    #[must_use]
    pub fn new(collector: GlucoseCollector<S>, scrape_timeout: Duration) -> Self {
        Self {
            collector,
            scrape_timeout,
        }
    }
}

/// Build the exporter router
pub fn router<S: GlucoseSource + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/glucose", get(handle_scrape::<S>))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives.
///
/// # Errors
/// Fails when the bind address is unusable or the server errors out.
pub async fn serve<S: GlucoseSource + 'static>(
    bind: &str,
    state: Arc<AppState<S>>,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(address = %bind, "starting exporter");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install shutdown signal handler");
        return;
    }
    info!("shutting down server");
}

async fn handle_scrape<S: GlucoseSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Response {
    let cancel = CancellationToken::new();
    let deadline = state.scrape_timeout;
    let timer = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(deadline).await;
            warn!("scrape deadline reached, cancelling in-flight requests");
            cancel.cancel();
        }
    });

    let observations = state.collector.collect(&cancel).await;
    timer.abort();

    match exposition::render(&observations) {
        Ok(body) => ([(header::CONTENT_TYPE, exposition::content_type())], body).into_response(),
        Err(error) => {
            // A scrape must never surface as a server error; serve an empty
            // exposition instead.
            warn!(%error, "failed to render exposition");
            ([(header::CONTENT_TYPE, exposition::content_type())], String::new()).into_response()
        }
    }
}

async fn handle_health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}
