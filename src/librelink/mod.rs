// ABOUTME: LibreLink Up API module grouping the wire model and the client
// ABOUTME: Re-exports the types the collection bridge and binary consume
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

/// Authenticated API client with region-redirect handling
pub mod client;
/// Serde data model for the wire format
pub mod models;

pub use client::{
    evaluate_redirect, region_base_url, ClientConfig, GlucoseSource, LibreLinkClient,
    PresetCredentials, SessionCredentials, DEFAULT_BASE_URL,
};
pub use models::{
    parse_timestamp, AuthRequest, AuthResponse, AuthTicket, Connection, Envelope, GlucoseMeasurement,
    GlucoseUnit, GraphData, RedirectPayload, RemoteError, TrendArrow, User, TIMESTAMP_FORMAT,
};
