// ABOUTME: Environment-first configuration for the exporter process
// ABOUTME: Account settings, preset credentials with validation, bind address, and timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use anyhow::{bail, ensure, Context, Result};
use chrono::{DateTime, Utc};
use std::env;
use std::time::Duration;

use crate::librelink::{ClientConfig, PresetCredentials};
use crate::logging::LoggingConfig;

/// Default bind address for the HTTP surface
pub const DEFAULT_BIND: &str = "0.0.0.0:5656";

/// Default whole-scrape deadline in seconds
pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 45;

/// Runtime configuration assembled from the environment
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Address the HTTP server binds to
    pub bind: String,
    /// LibreLink Up account email
    pub username: String,
    /// LibreLink Up account password
    pub password: String,
    /// Optional pre-issued credentials bypassing the initial login
    pub credentials: Option<PresetCredentials>,
    /// Whole-scrape deadline
    pub scrape_timeout: Duration,
    /// Per-request timeout for the API client
    pub http_timeout: Duration,
    /// Connection timeout for the API client
    pub http_connect_timeout: Duration,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl ExporterConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: `LIBRELINK_USERNAME`, `LIBRELINK_PASSWORD`. Optional:
    /// `LIBRELINK_USERID` + `LIBRELINK_TOKEN` (must appear together) with
    /// `LIBRELINK_TOKEN_EXPIRY` (RFC 3339, must be in the future), `BIND`,
    /// `SCRAPE_TIMEOUT_SECS`, `HTTP_TIMEOUT_SECS`,
    /// `HTTP_CONNECT_TIMEOUT_SECS`, plus the logging variables.
    ///
    /// # Errors
    /// Fails on missing required variables or invalid values.
    pub fn from_env() -> Result<Self> {
        let username =
            required_env("LIBRELINK_USERNAME").context("LIBRELINK_USERNAME is required")?;
        let password =
            required_env("LIBRELINK_PASSWORD").context("LIBRELINK_PASSWORD is required")?;

        Ok(Self {
            bind: env_var_or("BIND", DEFAULT_BIND),
            username,
            password,
            credentials: preset_credentials_from_env()?,
            scrape_timeout: duration_env("SCRAPE_TIMEOUT_SECS", DEFAULT_SCRAPE_TIMEOUT_SECS)?,
            http_timeout: duration_env("HTTP_TIMEOUT_SECS", 30)?,
            http_connect_timeout: duration_env("HTTP_CONNECT_TIMEOUT_SECS", 10)?,
            logging: LoggingConfig::from_env(),
        })
    }

    /// Derive the API client configuration
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.username.clone(), self.password.clone());
        config.credentials = self.credentials.clone();
        config.timeout = self.http_timeout;
        config.connect_timeout = self.http_connect_timeout;
        config
    }
}

fn required_env(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("environment variable {key} is not set"),
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

fn duration_env(key: &str, default_secs: u64) -> Result<Duration> {
    let secs = match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be an integer number of seconds"))?,
        _ => default_secs,
    };
    Ok(Duration::from_secs(secs))
}

/// Read and validate the optional pre-issued credential triple.
///
/// User id and token must be supplied together; a supplied expiry must lie
/// in the future.
fn preset_credentials_from_env() -> Result<Option<PresetCredentials>> {
    let user_id = env::var("LIBRELINK_USERID")
        .ok()
        .filter(|value| !value.is_empty());
    let token = env::var("LIBRELINK_TOKEN")
        .ok()
        .filter(|value| !value.is_empty());

    let (user_id, token) = match (user_id, token) {
        (None, None) => return Ok(None),
        (Some(user_id), Some(token)) => (user_id, token),
        _ => bail!("LIBRELINK_USERID and LIBRELINK_TOKEN must be provided together"),
    };

    let expiry = match env::var("LIBRELINK_TOKEN_EXPIRY") {
        Ok(raw) if !raw.is_empty() => Some(parse_expiry(&raw)?),
        _ => None,
    };
    if let Some(expiry) = expiry {
        ensure!(expiry > Utc::now(), "LIBRELINK_TOKEN_EXPIRY must be in the future");
    }

    Ok(Some(PresetCredentials {
        user_id,
        token,
        expiry,
    }))
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .context("LIBRELINK_TOKEN_EXPIRY must be an RFC 3339 timestamp")
}
