// ABOUTME: Structured error types for LibreLink Up client operations
// ABOUTME: Covers transport, protocol, remote rejection, and authentication failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use reqwest::StatusCode;

/// Errors surfaced by the LibreLink Up client.
///
/// Operations return these to the caller without retrying, with one
/// exception: a successful region redirect re-issues the original request
/// once before any error is raised.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network or IO failure while talking to the remote service
    #[error("request to '{endpoint}' failed")]
    Transport {
        /// Endpoint path the request was addressed to
        endpoint: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a non-success HTTP status
    #[error("unexpected HTTP status {status} from '{endpoint}'")]
    HttpStatus {
        /// HTTP status code received
        status: StatusCode,
        /// Endpoint path the request was addressed to
        endpoint: String,
    },

    /// Envelope or payload could not be decoded
    #[error("failed to decode {what}")]
    Decode {
        /// What was being decoded when the failure occurred
        what: &'static str,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The remote requested a redirect without naming a target region
    #[error("redirect requested but no region provided")]
    RedirectWithoutRegion,

    /// The remote redirected again after the client already switched regions
    #[error("redirected again after switching to region '{region}'")]
    RedirectLoop {
        /// Region the remote asked for on the second redirect
        region: String,
    },

    /// A region code produced an unparseable base URL
    #[error("invalid redirect target for region '{region}'")]
    InvalidRedirectTarget {
        /// Region code from the redirect payload
        region: String,
        /// Underlying URL parse error
        #[source]
        source: url::ParseError,
    },

    /// The remote rejected the request with a non-zero envelope status
    #[error("remote rejected request (status {status}): {message}")]
    Rejected {
        /// Envelope status value reported by the remote
        status: i64,
        /// Error message carried in the envelope, empty when absent
        message: String,
    },

    /// Authentication failed; wraps the underlying failure
    #[error("authentication failed")]
    Auth(#[source] Box<ClientError>),
}

impl ClientError {
    /// Wrap an error into the authentication specialization.
    ///
    /// Only `authenticate()` surfaces this variant; an `Auth` error is never
    /// nested inside another `Auth`.
    #[must_use]
    pub fn auth(source: ClientError) -> Self {
        match source {
            Self::Auth(_) => source,
            other => Self::Auth(Box::new(other)),
        }
    }
}
