// ABOUTME: Exporter binary: configuration, logging, client wiring, server startup
// ABOUTME: Loads settings from the environment with a few CLI overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

//! Binary entry point for the glucose exporter.

use anyhow::Result;
use clap::Parser;
use glucose_exporter::{
    collector::GlucoseCollector,
    config::ExporterConfig,
    librelink::LibreLinkClient,
    logging,
    routes::{self, AppState},
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "glucose-exporter")]
#[command(about = "Prometheus exporter for LibreLink Up glucose readings")]
struct Args {
    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ExporterConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    logging::init(&config.logging)?;

    if config.credentials.is_some() {
        info!("using provided credentials");
    }

    let client = LibreLinkClient::new(config.client_config());
    let collector = GlucoseCollector::new(client);
    let state = Arc::new(AppState::new(collector, config.scrape_timeout));

    routes::serve(&config.bind, state).await
}
