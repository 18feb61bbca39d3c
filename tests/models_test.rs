// ABOUTME: Tests for the LibreLink Up wire model
// ABOUTME: Validates timestamp parsing, ticket conversion, measurement decoding, and envelope inspection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{TimeZone, Utc};
use glucose_exporter::librelink::{
    parse_timestamp, AuthResponse, AuthTicket, Connection, Envelope, GlucoseMeasurement,
    GlucoseUnit, GraphData, TrendArrow,
};
use std::time::Duration;

#[test]
fn test_parse_timestamp_valid() {
    let parsed = parse_timestamp("9/7/2025 6:01:03 PM").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 9, 7, 18, 1, 3).unwrap());
}

#[test]
fn test_parse_timestamp_padded() {
    let parsed = parse_timestamp("09/07/2025 06:01:03 AM").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 9, 7, 6, 1, 3).unwrap());
}

#[test]
fn test_parse_timestamp_malformed_month() {
    // Month 19 must fail decoding, never default to epoch.
    assert!(parse_timestamp("19/7/2025 6:01:03 PM").is_err());
}

#[test]
fn test_parse_timestamp_missing_meridiem() {
    assert!(parse_timestamp("9/7/2025 18:01:03").is_err());
}

#[test]
fn test_auth_ticket_epoch_and_millis_conversion() {
    let ticket: AuthTicket = serde_json::from_value(serde_json::json!({
        "token": "eyveioubn",
        "expires": 1_773_417_313_i64,
        "duration": 15_552_000_000_i64,
    }))
    .unwrap();

    assert_eq!(ticket.token, "eyveioubn");
    assert_eq!(
        ticket.expires,
        Utc.timestamp_opt(1_773_417_313, 0).single().unwrap()
    );
    assert_eq!(ticket.duration, Duration::from_millis(15_552_000_000));
}

#[test]
fn test_auth_response_decoding() {
    let auth: AuthResponse = serde_json::from_value(serde_json::json!({
        "user": {
            "id": "user-1",
            "firstName": "Jane",
            "lastName": "Doe",
            "email": "jane@example.com",
            "country": "DE",
        },
        "authTicket": {
            "token": "tok",
            "expires": 1_773_417_313_i64,
            "duration": 3_600_000_i64,
        },
    }))
    .unwrap();

    assert_eq!(auth.user.id, "user-1");
    assert_eq!(auth.auth_ticket.token, "tok");
}

#[test]
fn test_measurement_decoding() {
    let measurement: GlucoseMeasurement = serde_json::from_value(serde_json::json!({
        "FactoryTimestamp": "9/7/2025 6:01:03 PM",
        "type": 1,
        "ValueInMgPerDl": 99.0,
        "MeasurementColor": 1,
        "GlucoseUnits": 0,
        "Value": 5.5,
        "isHigh": false,
        "isLow": true,
        "TrendArrow": 3,
        "TrendMessage": null,
    }))
    .unwrap();

    assert_eq!(
        measurement.timestamp,
        Utc.with_ymd_and_hms(2025, 9, 7, 18, 1, 3).unwrap()
    );
    assert!((measurement.value - 5.5).abs() < f64::EPSILON);
    assert_eq!(measurement.units, GlucoseUnit::MmolPerL);
    assert_eq!(measurement.trend, TrendArrow::Right);
    assert!(measurement.is_low);
    assert!(!measurement.is_high);
}

#[test]
fn test_measurement_malformed_timestamp_fails_entry() {
    let result: Result<GlucoseMeasurement, _> = serde_json::from_value(serde_json::json!({
        "FactoryTimestamp": "not a date",
        "Value": 5.5,
    }));
    assert!(result.is_err());
}

#[test]
fn test_trend_arrow_codes() {
    assert_eq!(TrendArrow::from(0), TrendArrow::None);
    assert_eq!(TrendArrow::from(1), TrendArrow::Down);
    assert_eq!(TrendArrow::from(5), TrendArrow::Up);
    // Unknown codes collapse to no trend.
    assert_eq!(TrendArrow::from(42), TrendArrow::None);
    assert_eq!(TrendArrow::Up.code(), 5);
}

#[test]
fn test_glucose_unit_codes() {
    assert_eq!(GlucoseUnit::from(1), GlucoseUnit::MgPerDl);
    assert_eq!(GlucoseUnit::from(0), GlucoseUnit::MmolPerL);
}

#[test]
fn test_envelope_redirect_inspection() {
    let envelope: Envelope = serde_json::from_value(serde_json::json!({
        "status": 0,
        "data": { "redirect": true, "region": "de" },
    }))
    .unwrap();
    let redirect = envelope.redirect().unwrap();
    assert_eq!(redirect.region, "de");
}

#[test]
fn test_envelope_redirect_false_is_not_a_redirect() {
    let envelope: Envelope = serde_json::from_value(serde_json::json!({
        "status": 0,
        "data": { "redirect": false, "region": "de" },
    }))
    .unwrap();
    assert!(envelope.redirect().is_none());
}

#[test]
fn test_envelope_non_redirect_payload_is_not_an_error() {
    // An array payload cannot decode as a redirect; that means "not a
    // redirect", not a failure.
    let envelope: Envelope = serde_json::from_value(serde_json::json!({
        "status": 0,
        "data": [ { "id": "c-1", "patientId": "p-1" } ],
    }))
    .unwrap();
    assert!(envelope.redirect().is_none());

    let connections: Vec<Connection> = envelope.payload("connections payload").unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].patient_id, "p-1");
}

#[test]
fn test_graph_data_decoding() {
    let graph: GraphData = serde_json::from_value(serde_json::json!({
        "connection": {
            "id": "c-1",
            "patientId": "p-1",
            "firstName": "Jane",
            "lastName": "Doe",
            "glucoseMeasurement": {
                "FactoryTimestamp": "9/7/2025 6:01:03 PM",
                "Value": 5.5,
                "TrendArrow": 4,
            },
        },
        "graphData": [
            { "FactoryTimestamp": "9/7/2025 5:45:03 PM", "Value": 5.1 },
            { "FactoryTimestamp": "9/7/2025 6:00:03 PM", "Value": 5.4 },
        ],
    }))
    .unwrap();

    assert_eq!(graph.connection.full_name(), "Jane Doe");
    assert_eq!(graph.graph_data.len(), 2);
    let current = graph.connection.glucose_measurement.unwrap();
    assert_eq!(current.trend, TrendArrow::UpRight);
}

#[test]
fn test_connection_without_current_reading() {
    let connection: Connection = serde_json::from_value(serde_json::json!({
        "id": "c-1",
        "patientId": "p-1",
        "firstName": "Jane",
        "lastName": "Doe",
    }))
    .unwrap();
    assert!(connection.glucose_measurement.is_none());
}
