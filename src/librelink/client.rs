// ABOUTME: Authenticated LibreLink Up API client with region-redirect handling
// ABOUTME: Manages session credentials and typed login/connections/graph operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Glucose Exporter Contributors

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, ClientBuilder, Method};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use super::models::{AuthRequest, AuthResponse, Connection, Envelope, GraphData};
use crate::errors::ClientError;

/// Base URL used until the remote redirects the account to a region
pub const DEFAULT_BASE_URL: &str = "https://api.libreview.io";

const LOGIN_ENDPOINT: &str = "llu/auth/login";
const CONNECTIONS_ENDPOINT: &str = "llu/connections";

/// Product identification headers required by the remote service
const PRODUCT_HEADER: &str = "llu.android";
const VERSION_HEADER: &str = "4.16.0";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Resolve the region-specific base URL for a redirect target.
///
/// # Errors
/// Returns [`ClientError::InvalidRedirectTarget`] when the region code does
/// not form a valid URL.
pub fn region_base_url(region: &str) -> Result<Url, ClientError> {
    Url::parse(&format!("https://api-{region}.libreview.io")).map_err(|source| {
        ClientError::InvalidRedirectTarget {
            region: region.to_owned(),
            source,
        }
    })
}

/// Decide whether an envelope reroutes the client to another region.
///
/// Returns the new base URL when a redirect is signaled, `None` when the
/// envelope is a regular payload. A redirect without a region is
/// unrecoverable, and a redirect arriving after the client already switched
/// regions is treated as a loop rather than followed.
///
/// # Errors
/// [`ClientError::RedirectWithoutRegion`] or [`ClientError::RedirectLoop`]
/// per the rules above.
pub fn evaluate_redirect(
    envelope: &Envelope,
    already_redirected: bool,
) -> Result<Option<Url>, ClientError> {
    let Some(redirect) = envelope.redirect() else {
        return Ok(None);
    };

    if redirect.region.is_empty() {
        return Err(ClientError::RedirectWithoutRegion);
    }
    if already_redirected {
        return Err(ClientError::RedirectLoop {
            region: redirect.region,
        });
    }

    region_base_url(&redirect.region).map(Some)
}

/// Pre-issued credentials supplied at startup to bypass the login call
#[derive(Debug, Clone)]
pub struct PresetCredentials {
    /// Remote user id the token was issued for
    pub user_id: String,
    /// Pre-issued bearer token
    pub token: String,
    /// Token expiry, when known
    pub expiry: Option<DateTime<Utc>>,
}

/// In-memory session state derived from a login or preset credentials.
///
/// Held for the process lifetime, never persisted, and never proactively
/// refreshed; a missing session is re-established from scratch on the next
/// scrape.
#[derive(Clone)]
pub struct SessionCredentials {
    token: String,
    expires: Option<DateTime<Utc>>,
    account_id: String,
}

impl SessionCredentials {
    /// Derive session credentials, hashing the remote user id into the
    /// stable account identifier sent with every request.
    #[must_use]
    pub fn derive(user_id: &str, token: String, expires: Option<DateTime<Utc>>) -> Self {
        let account_id = hex::encode(Sha256::digest(user_id.as_bytes()));
        Self {
            token,
            expires,
            account_id,
        }
    }

    /// Stable account identifier (lowercase hex SHA-256 of the user id)
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Token expiry, when known
    #[must_use]
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("token", &"<redacted>")
            .field("expires", &self.expires)
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Client construction parameters with named optional fields
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account email used for login
    pub username: String,
    /// Account password used for login
    pub password: String,
    /// Pre-issued credentials that bypass the initial login
    pub credentials: Option<PresetCredentials>,
    /// Base URL override; `None` uses [`DEFAULT_BASE_URL`]
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default timeouts and no preset credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            credentials: None,
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Session-holding client for the LibreLink Up API.
///
/// Owns the credentials and the resolved base URL exclusively. Concurrent
/// scrapes may race to authenticate; the brief lock guards protect only
/// field access, so redundant logins are possible and tolerated.
pub struct LibreLinkClient {
    http: Client,
    base_url: RwLock<String>,
    username: String,
    password: String,
    credentials: RwLock<Option<SessionCredentials>>,
}

impl LibreLinkClient {
    /// Build a client from explicit configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let http = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let credentials = config.credentials.map(|preset| {
            SessionCredentials::derive(&preset.user_id, preset.token, preset.expiry)
        });

        Self {
            http,
            base_url: RwLock::new(
                config
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            ),
            username: config.username,
            password: config.password,
            credentials: RwLock::new(credentials),
        }
    }

    /// Submit the account email and password, storing derived session
    /// credentials on success.
    ///
    /// No retries; the caller decides whether to try again on the next
    /// scrape.
    ///
    /// # Errors
    /// [`ClientError::Auth`] wrapping the underlying failure on network
    /// error, non-success envelope status, or malformed payload.
    pub async fn authenticate(&self) -> Result<(), ClientError> {
        self.login().await.map_err(ClientError::auth)
    }

    async fn login(&self) -> Result<(), ClientError> {
        let body = AuthRequest {
            email: self.username.clone(),
            password: self.password.clone(),
        };
        let envelope = self.send(Method::POST, LOGIN_ENDPOINT, Some(&body)).await?;
        let auth: AuthResponse = envelope.payload("login payload")?;

        info!(expires = %auth.auth_ticket.expires, "authenticated with LibreLink Up");
        let derived = SessionCredentials::derive(
            &auth.user.id,
            auth.auth_ticket.token,
            Some(auth.auth_ticket.expires),
        );
        *self.credentials.write().await = Some(derived);
        Ok(())
    }

    /// Whether session credentials are currently held. Never checks expiry.
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// List the monitored connections for the current session.
    ///
    /// # Errors
    /// Transport, protocol, or rejection errors from the request.
    pub async fn list_connections(&self) -> Result<Vec<Connection>, ClientError> {
        let envelope = self
            .send(Method::GET, CONNECTIONS_ENDPOINT, Option::<&()>::None)
            .await?;
        envelope.payload("connections payload")
    }

    /// Fetch the current and historic readings for one connection.
    ///
    /// # Errors
    /// Transport, protocol, or rejection errors from the request.
    pub async fn fetch_graph_data(&self, connection_id: &str) -> Result<GraphData, ClientError> {
        let endpoint = format!("llu/connections/{connection_id}/graph");
        let envelope = self
            .send(Method::GET, &endpoint, Option::<&()>::None)
            .await?;
        envelope.payload("graph payload")
    }

    /// Issue a request, following at most one region redirect.
    ///
    /// The redirect check runs for every request type, including login,
    /// since the remote may reroute the account on first contact.
    async fn send<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Envelope, ClientError>
    where
        B: Serialize + Sync,
    {
        let mut redirected = false;
        loop {
            let envelope = self.execute_once(method.clone(), endpoint, body).await?;
            match evaluate_redirect(&envelope, redirected)? {
                None => return Ok(envelope),
                Some(base) => {
                    info!(new_base_url = %base, "redirected to new region, retrying request");
                    *self.base_url.write().await = String::from(base);
                    redirected = true;
                }
            }
        }
    }

    async fn execute_once<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Envelope, ClientError>
    where
        B: Serialize + Sync,
    {
        let url = {
            let base = self.base_url.read().await;
            format!("{}/{}", base.trim_end_matches('/'), endpoint)
        };
        debug!(%method, %url, "preparing request");

        let mut request = self
            .http
            .request(method, url.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .header("product", PRODUCT_HEADER)
            .header("version", VERSION_HEADER)
            .header(header::CACHE_CONTROL, "no-cache");

        {
            let credentials = self.credentials.read().await;
            if let Some(creds) = credentials.as_ref() {
                debug!("using existing credentials");
                request = request
                    .header("account-id", creds.account_id.clone())
                    .bearer_auth(&creds.token);
            } else {
                debug!("no credentials available, proceeding without authentication");
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_owned(),
                source,
            })?;

        let status = response.status();
        debug!(%status, "request completed");
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status,
                endpoint: endpoint.to_owned(),
            });
        }

        let raw = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_owned(),
                source,
            })?;
        let envelope: Envelope =
            serde_json::from_slice(&raw).map_err(|source| ClientError::Decode {
                what: "response envelope",
                source,
            })?;

        // Any non-zero status short-circuits before redirect inspection.
        if envelope.status != 0 {
            let message = envelope
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_default();
            return Err(ClientError::Rejected {
                status: envelope.status,
                message,
            });
        }

        Ok(envelope)
    }
}

/// Seam between the collection bridge and the remote service.
///
/// Lets the bridge run against a stub in tests while the production path
/// uses [`LibreLinkClient`].
#[async_trait]
pub trait GlucoseSource: Send + Sync {
    /// Establish a session; see [`LibreLinkClient::authenticate`]
    async fn authenticate(&self) -> Result<(), ClientError>;

    /// Whether a session is currently held
    async fn is_authenticated(&self) -> bool;

    /// List monitored connections
    async fn list_connections(&self) -> Result<Vec<Connection>, ClientError>;

    /// Fetch current and historic readings for one connection
    async fn fetch_graph_data(&self, connection_id: &str) -> Result<GraphData, ClientError>;
}

#[async_trait]
impl<S: GlucoseSource + ?Sized> GlucoseSource for std::sync::Arc<S> {
    async fn authenticate(&self) -> Result<(), ClientError> {
        (**self).authenticate().await
    }

    async fn is_authenticated(&self) -> bool {
        (**self).is_authenticated().await
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, ClientError> {
        (**self).list_connections().await
    }

    async fn fetch_graph_data(&self, connection_id: &str) -> Result<GraphData, ClientError> {
        (**self).fetch_graph_data(connection_id).await
    }
}

#[async_trait]
impl GlucoseSource for LibreLinkClient {
    async fn authenticate(&self) -> Result<(), ClientError> {
        Self::authenticate(self).await
    }

    async fn is_authenticated(&self) -> bool {
        Self::is_authenticated(self).await
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, ClientError> {
        Self::list_connections(self).await
    }

    async fn fetch_graph_data(&self, connection_id: &str) -> Result<GraphData, ClientError> {
        Self::fetch_graph_data(self, connection_id).await
    }
}
