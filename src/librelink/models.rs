// ABOUTME: Serde data model for the LibreLink Up wire format
// ABOUTME: Envelope, auth ticket, connections, and glucose measurements with localized timestamps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::errors::ClientError;

/// Wire format of measurement timestamps: `M/D/YYYY h:mm:ss AM|PM`,
/// no timezone, taken as UTC.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Parse a localized measurement timestamp into a UTC instant.
///
/// Malformed input is an error; timestamps are never defaulted to epoch.
///
/// # Errors
/// Returns a `chrono::ParseError` when the string does not match
/// [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map(|dt| dt.and_utc())
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn de_epoch_seconds<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = i64::deserialize(deserializer)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| serde::de::Error::custom(format!("epoch seconds out of range: {secs}")))
}

fn de_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

/// Outer wrapper carried by every remote response.
///
/// A status of zero means success; any other value means the payload must be
/// ignored and the request treated as rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Remote status value; zero on success
    #[serde(default)]
    pub status: i64,
    /// Operation payload; shape depends on the endpoint
    #[serde(default)]
    pub data: serde_json::Value,
    /// Remote error details, present on rejection
    #[serde(default)]
    pub error: Option<RemoteError>,
}

impl Envelope {
    /// Decode the payload into the expected shape for this operation.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] when the payload does not match `T`.
    pub fn payload<T>(&self, what: &'static str) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.data.clone())
            .map_err(|source| ClientError::Decode { what, source })
    }

    /// Inspect the payload for a region-redirect instruction.
    ///
    /// The redirect shape is decoded speculatively; a payload that does not
    /// decode as a redirect is simply not a redirect, never an error.
    #[must_use]
    pub fn redirect(&self) -> Option<RedirectPayload> {
        serde_json::from_value::<RedirectPayload>(self.data.clone())
            .ok()
            .filter(|payload| payload.redirect)
    }
}

/// Error details carried inside a rejection envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    /// Human-readable message supplied by the remote
    #[serde(default)]
    pub message: String,
}

/// Payload shape signaling that the account lives in another region
#[derive(Debug, Clone, Deserialize)]
pub struct RedirectPayload {
    /// Whether a redirect is requested
    #[serde(default)]
    pub redirect: bool,
    /// Target region code; empty is an unrecoverable protocol error
    #[serde(default)]
    pub region: String,
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Account email address
    pub email: String,
    /// Account password
    pub password: String,
}

/// Bearer token with expiry issued on login
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTicket {
    /// Opaque bearer token
    pub token: String,
    /// Absolute expiry instant, sent as integer seconds since epoch
    #[serde(deserialize_with = "de_epoch_seconds")]
    pub expires: DateTime<Utc>,
    /// Ticket validity, sent as integer milliseconds
    #[serde(deserialize_with = "de_millis")]
    pub duration: Duration,
}

/// Account owner record returned by login
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Remote user id; hashed into the stable account identifier
    pub id: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Account email
    #[serde(default)]
    pub email: String,
    /// Account country code
    #[serde(default)]
    pub country: String,
}

/// Successful login payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Account owner
    pub user: User,
    /// Issued session ticket
    pub auth_ticket: AuthTicket,
}

/// Glucose unit configured on the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "i64")]
pub enum GlucoseUnit {
    /// Millimoles per litre (wire value 0)
    #[default]
    MmolPerL,
    /// Milligrams per decilitre (wire value 1)
    MgPerDl,
}

impl From<i64> for GlucoseUnit {
    fn from(value: i64) -> Self {
        if value == 1 {
            Self::MgPerDl
        } else {
            Self::MmolPerL
        }
    }
}

/// Glucose rate-of-change direction code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "i64")]
pub enum TrendArrow {
    /// No trend reported (wire value 0, also any unknown code)
    #[default]
    None = 0,
    /// Falling quickly
    Down = 1,
    /// Falling
    DownRight = 2,
    /// Stable
    Right = 3,
    /// Rising
    UpRight = 4,
    /// Rising quickly
    Up = 5,
}

impl From<i64> for TrendArrow {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Down,
            2 => Self::DownRight,
            3 => Self::Right,
            4 => Self::UpRight,
            5 => Self::Up,
            _ => Self::None,
        }
    }
}

impl TrendArrow {
    /// Numeric trend code as exported in the trend metric
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A single glucose measurement
#[derive(Debug, Clone, Deserialize)]
pub struct GlucoseMeasurement {
    /// Measurement instant, parsed from the localized factory timestamp
    #[serde(rename = "FactoryTimestamp", deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Measurement kind discriminator
    #[serde(rename = "type", default)]
    pub measurement_type: i64,
    /// Value normalised to mg/dL regardless of the account unit
    #[serde(rename = "ValueInMgPerDl", default)]
    pub value_in_mg_per_dl: f64,
    /// Remote display colour code
    #[serde(rename = "MeasurementColor", default)]
    pub measurement_color: i64,
    /// Unit the `Value` field is expressed in
    #[serde(rename = "GlucoseUnits", default)]
    pub units: GlucoseUnit,
    /// Value in the account's configured unit
    #[serde(rename = "Value")]
    pub value: f64,
    /// Above the configured high threshold
    #[serde(rename = "isHigh", default)]
    pub is_high: bool,
    /// Below the configured low threshold
    #[serde(rename = "isLow", default)]
    pub is_low: bool,
    /// Rate-of-change direction
    #[serde(rename = "TrendArrow", default)]
    pub trend: TrendArrow,
    /// Optional trend text supplied by the remote
    #[serde(rename = "TrendMessage", default)]
    pub trend_message: Option<String>,
}

/// A monitored person/device associated with the account
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Stable connection id
    pub id: String,
    /// Patient id; used both as metric label and graph-endpoint key
    pub patient_id: String,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Current reading, absent when no recent data exists
    #[serde(default)]
    pub glucose_measurement: Option<GlucoseMeasurement>,
    /// Alternate current-reading slot used by some payloads
    #[serde(default)]
    pub glucose_item: Option<GlucoseMeasurement>,
}

impl Connection {
    /// Full display name used as the `patient_name` metric label
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Current reading plus the sliding window of historic readings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    /// Connection record with the embedded current reading
    pub connection: Connection,
    /// Historic readings in remote order, each with its own timestamp
    #[serde(default)]
    pub graph_data: Vec<GlucoseMeasurement>,
}
