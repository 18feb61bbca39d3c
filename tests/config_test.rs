// ABOUTME: Tests for environment-first configuration loading
// ABOUTME: Validates required variables, defaults, and preset credential rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use glucose_exporter::config::{ExporterConfig, DEFAULT_BIND};
use serial_test::serial;
use std::env;
use std::time::Duration;

const ALL_VARS: &[&str] = &[
    "BIND",
    "LIBRELINK_USERNAME",
    "LIBRELINK_PASSWORD",
    "LIBRELINK_USERID",
    "LIBRELINK_TOKEN",
    "LIBRELINK_TOKEN_EXPIRY",
    "SCRAPE_TIMEOUT_SECS",
    "HTTP_TIMEOUT_SECS",
    "HTTP_CONNECT_TIMEOUT_SECS",
];

fn clear_env() {
    for key in ALL_VARS {
        env::remove_var(key);
    }
}

fn set_account() {
    env::set_var("LIBRELINK_USERNAME", "jane@example.com");
    env::set_var("LIBRELINK_PASSWORD", "hunter2");
}

#[test]
#[serial]
fn test_defaults_with_required_account() {
    clear_env();
    set_account();

    let config = ExporterConfig::from_env().unwrap();
    assert_eq!(config.bind, DEFAULT_BIND);
    assert_eq!(config.username, "jane@example.com");
    assert!(config.credentials.is_none());
    assert_eq!(config.scrape_timeout, Duration::from_secs(45));
    assert_eq!(config.http_timeout, Duration::from_secs(30));
    assert_eq!(config.http_connect_timeout, Duration::from_secs(10));
}

#[test]
#[serial]
fn test_missing_username_fails() {
    clear_env();
    env::set_var("LIBRELINK_PASSWORD", "hunter2");

    assert!(ExporterConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_missing_password_fails() {
    clear_env();
    env::set_var("LIBRELINK_USERNAME", "jane@example.com");

    assert!(ExporterConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_preset_credentials_require_both_parts() {
    clear_env();
    set_account();
    env::set_var("LIBRELINK_USERID", "user-1");

    assert!(ExporterConfig::from_env().is_err());

    env::remove_var("LIBRELINK_USERID");
    env::set_var("LIBRELINK_TOKEN", "tok");
    assert!(ExporterConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_preset_credentials_accepted_together() {
    clear_env();
    set_account();
    env::set_var("LIBRELINK_USERID", "user-1");
    env::set_var("LIBRELINK_TOKEN", "tok");

    let config = ExporterConfig::from_env().unwrap();
    let credentials = config.credentials.unwrap();
    assert_eq!(credentials.user_id, "user-1");
    assert_eq!(credentials.token, "tok");
    assert!(credentials.expiry.is_none());
}

#[test]
#[serial]
fn test_expired_preset_token_rejected() {
    clear_env();
    set_account();
    env::set_var("LIBRELINK_USERID", "user-1");
    env::set_var("LIBRELINK_TOKEN", "tok");
    env::set_var("LIBRELINK_TOKEN_EXPIRY", "2020-01-01T00:00:00Z");

    assert!(ExporterConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_future_expiry_accepted() {
    clear_env();
    set_account();
    env::set_var("LIBRELINK_USERID", "user-1");
    env::set_var("LIBRELINK_TOKEN", "tok");
    env::set_var("LIBRELINK_TOKEN_EXPIRY", "2099-01-01T00:00:00Z");

    let config = ExporterConfig::from_env().unwrap();
    assert!(config.credentials.unwrap().expiry.is_some());
}

#[test]
#[serial]
fn test_invalid_expiry_format_rejected() {
    clear_env();
    set_account();
    env::set_var("LIBRELINK_USERID", "user-1");
    env::set_var("LIBRELINK_TOKEN", "tok");
    env::set_var("LIBRELINK_TOKEN_EXPIRY", "next tuesday");

    assert!(ExporterConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_timeout_overrides() {
    clear_env();
    set_account();
    env::set_var("SCRAPE_TIMEOUT_SECS", "10");
    env::set_var("HTTP_TIMEOUT_SECS", "5");

    let config = ExporterConfig::from_env().unwrap();
    assert_eq!(config.scrape_timeout, Duration::from_secs(10));
    assert_eq!(config.http_timeout, Duration::from_secs(5));
}

#[test]
#[serial]
fn test_invalid_timeout_rejected() {
    clear_env();
    set_account();
    env::set_var("SCRAPE_TIMEOUT_SECS", "soon");

    assert!(ExporterConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_client_config_inherits_account_and_timeouts() {
    clear_env();
    set_account();
    env::set_var("HTTP_TIMEOUT_SECS", "7");

    let config = ExporterConfig::from_env().unwrap();
    let client_config = config.client_config();
    assert_eq!(client_config.username, "jane@example.com");
    assert_eq!(client_config.timeout, Duration::from_secs(7));
    assert!(client_config.base_url.is_none());
}
