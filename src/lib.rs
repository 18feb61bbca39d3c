// ABOUTME: Library root for the glucose exporter
// ABOUTME: LibreLink Up API client, collection bridge, exposition, and HTTP surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

//! Prometheus exporter for LibreLink Up glucose readings.
//!
//! The crate polls the LibreLink Up cloud API on behalf of a single
//! configured account and serves the readings as timestamped Prometheus
//! samples. Each scrape re-fetches fully from the remote: the only state
//! held across scrapes is the client's in-memory session.

/// Metric collection bridge
pub mod collector;
/// Environment-first configuration
pub mod config;
/// Structured error types
pub mod errors;
/// Prometheus text exposition
pub mod exposition;
/// LibreLink Up API client and wire model
pub mod librelink;
/// Logging setup
pub mod logging;
/// HTTP routes and server
pub mod routes;

pub use collector::{GlucoseCollector, Observation, Series};
pub use config::ExporterConfig;
pub use errors::ClientError;
pub use librelink::{ClientConfig, GlucoseSource, LibreLinkClient, PresetCredentials};
