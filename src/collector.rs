// ABOUTME: Metric collection bridge turning glucose readings into timestamped observations
// ABOUTME: One synchronous pass per scrape with silent aborts and per-connection isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::librelink::{Connection, GlucoseSource, GraphData};

/// Metric series emitted by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    /// Current glucose level in the account's unit
    Level,
    /// Current trend code
    Trend,
    /// Historic glucose level
    HistoricLevel,
}

impl Series {
    /// All series in exposition order
    pub const ALL: [Self; 3] = [Self::Level, Self::Trend, Self::HistoricLevel];

    /// Fully qualified metric name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Level => "glucose_librelink_level_mmoll",
            Self::Trend => "glucose_librelink_trend",
            Self::HistoricLevel => "glucose_librelink_historic_level",
        }
    }

    /// Help text for the metric family
    #[must_use]
    pub fn help(self) -> &'static str {
        match self {
            Self::Level => "Current glucose level in mmol/L",
            Self::Trend => "Current glucose trend",
            Self::HistoricLevel => "Historic glucose data",
        }
    }
}

/// One labeled, timestamped numeric observation.
///
/// The timestamp is the reading's own instant, never the scrape time.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Series this observation belongs to
    pub series: Series,
    /// Numeric value
    pub value: f64,
    /// `patient_id` label
    pub patient_id: String,
    /// `patient_name` label (full display name)
    pub patient_name: String,
    /// Original reading instant
    pub timestamp: DateTime<Utc>,
}

/// Per-scrape bridge between the API client and the exposition layer.
///
/// Owns nothing persistent beyond the client's session; every scrape
/// re-fetches fully from the remote.
pub struct GlucoseCollector<S> {
    source: S,
}

impl<S: GlucoseSource> GlucoseCollector<S> {
    /// Wrap a glucose source
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run one scrape, returning all assembled observations.
    ///
    /// Whole-scrape failures (authentication, connection listing) abort
    /// silently with an empty result; a failing connection only drops that
    /// connection's data. On cancellation, observations for fully processed
    /// connections are returned and in-flight remote calls are abandoned.
    pub async fn collect(&self, cancel: &CancellationToken) -> Vec<Observation> {
        if cancel.is_cancelled() {
            return Vec::new();
        }

        if !self.source.is_authenticated().await {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return Vec::new(),
                outcome = self.source.authenticate() => outcome,
            };
            if let Err(error) = outcome {
                warn!(%error, "authentication failed, skipping scrape");
                return Vec::new();
            }
        }

        let connections = tokio::select! {
            () = cancel.cancelled() => return Vec::new(),
            outcome = self.source.list_connections() => match outcome {
                Ok(connections) => connections,
                Err(error) => {
                    warn!(%error, "failed to list connections, skipping scrape");
                    return Vec::new();
                }
            },
        };

        let mut observations = Vec::new();
        for connection in &connections {
            if cancel.is_cancelled() {
                break;
            }
            let graph = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.source.fetch_graph_data(&connection.patient_id) => match outcome {
                    Ok(graph) => graph,
                    Err(error) => {
                        warn!(
                            patient_id = %connection.patient_id,
                            %error,
                            "failed to fetch graph data, skipping connection"
                        );
                        continue;
                    }
                },
            };
            observations.extend(Self::connection_observations(connection, &graph));
        }

        observations
    }

    /// Observations for one fully fetched connection.
    ///
    /// Labels come from the listed connection; the current reading comes
    /// from the graph payload's embedded connection. A missing current
    /// reading skips the level/trend pair but still emits the historic
    /// series.
    fn connection_observations(connection: &Connection, graph: &GraphData) -> Vec<Observation> {
        let patient_name = connection.full_name();
        let mut batch = Vec::with_capacity(graph.graph_data.len() + 2);

        if let Some(reading) = &graph.connection.glucose_measurement {
            batch.push(Observation {
                series: Series::Level,
                value: reading.value,
                patient_id: connection.patient_id.clone(),
                patient_name: patient_name.clone(),
                timestamp: reading.timestamp,
            });
            batch.push(Observation {
                series: Series::Trend,
                value: f64::from(reading.trend.code()),
                patient_id: connection.patient_id.clone(),
                patient_name: patient_name.clone(),
                timestamp: reading.timestamp,
            });
        } else {
            debug!(
                patient_id = %connection.patient_id,
                "no current reading, emitting historic series only"
            );
        }

        for historic in &graph.graph_data {
            batch.push(Observation {
                series: Series::HistoricLevel,
                value: historic.value,
                patient_id: connection.patient_id.clone(),
                patient_name: patient_name.clone(),
                timestamp: historic.timestamp,
            });
        }

        batch
    }
}
