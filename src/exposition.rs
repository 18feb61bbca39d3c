// ABOUTME: Prometheus text exposition for collected observations
// ABOUTME: Builds proto metric families so every sample keeps its original timestamp
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

use crate::collector::{Observation, Series};

/// Content type of the rendered exposition
#[must_use]
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_owned()
}

/// Render observations into the Prometheus text format.
///
/// Families follow [`Series::ALL`] order; empty series are omitted.
/// Repeated historic points across successive scrapes are rendered
/// identically each time, deduplication is the downstream scraper's job.
///
/// # Errors
/// Returns a `prometheus::Error` when encoding fails.
pub fn render(observations: &[Observation]) -> Result<String, prometheus::Error> {
    let families: Vec<MetricFamily> = Series::ALL
        .iter()
        .filter_map(|series| family_for(*series, observations))
        .collect();

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|error| prometheus::Error::Msg(format!("non-UTF-8 exposition output: {error}")))
}

fn family_for(series: Series, observations: &[Observation]) -> Option<MetricFamily> {
    let mut family = MetricFamily::default();
    family.set_name(series.name().to_owned());
    family.set_help(series.help().to_owned());
    family.set_field_type(MetricType::GAUGE);

    for observation in observations.iter().filter(|o| o.series == series) {
        family.mut_metric().push(to_metric(observation));
    }

    if family.get_metric().is_empty() {
        None
    } else {
        Some(family)
    }
}

fn to_metric(observation: &Observation) -> Metric {
    let mut metric = Metric::default();

    let mut patient_id = LabelPair::default();
    patient_id.set_name("patient_id".to_owned());
    patient_id.set_value(observation.patient_id.clone());
    metric.mut_label().push(patient_id);

    let mut patient_name = LabelPair::default();
    patient_name.set_name("patient_name".to_owned());
    patient_name.set_value(observation.patient_name.clone());
    metric.mut_label().push(patient_name);

    let mut gauge = Gauge::default();
    gauge.set_value(observation.value);
    metric.set_gauge(gauge);
    metric.set_timestamp_ms(observation.timestamp.timestamp_millis());

    metric
}
