//! HTTP transport for the Splunk REST API.
//!
//! Thin wrapper over reqwest: one attempt per call, no retry or backoff.
//! Every URL gets `output_mode=json` plus the caller's query parameters.
//! Bodies are JSON or form-urlencoded, selected per call. Status
//! classification lives here and nowhere else, so callers switch on
//! [`SplunkError::NotFound`] instead of sniffing error strings.

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::secure_string::SecureString;
use steward_core::{Result, SplunkError};

/// Authentication for the Splunk management port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication (test servers only).
    None,
    /// Bearer token authentication.
    BearerToken { token: SecureString },
    /// Basic authentication.
    Basic {
        username: String,
        password: SecureString,
    },
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::None
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

/// Connection configuration for a Splunk instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplunkConfig {
    /// Management URL, e.g. `https://splunk.example.com:8089`.
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates. Splunk management ports commonly
    /// run with self-signed certificates, so this is configurable.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

impl SplunkConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthConfig::None,
            timeout_secs: default_timeout(),
            verify_tls: default_verify_tls(),
        }
    }
}

/// Client for the Splunk REST API.
pub struct SplunkClient {
    client: Client,
    config: SplunkConfig,
}

/// Maximum response-body length carried inside an error.
const ERROR_BODY_LIMIT: usize = 500;

impl SplunkClient {
    /// Builds a client from configuration.
    pub fn new(config: SplunkConfig) -> Result<Self> {
        if !config.verify_tls {
            warn!(
                base_url = %config.base_url,
                "TLS certificate verification disabled; connection is open to interception"
            );
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SplunkError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Builds the full URL: base + path + `output_mode=json` + query params.
    /// The path arrives with its segments already percent-encoded.
    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let raw = format!("{}/{}", base, path.trim_start_matches('/'));
        let mut url =
            Url::parse(&raw).map_err(|e| SplunkError::Config(format!("invalid url {raw}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("output_mode", "json");
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            AuthConfig::None => request,
            AuthConfig::BearerToken { token } => request.bearer_auth(token.expose_secret()),
            AuthConfig::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
        }
    }

    /// Classifies a response status. Besides literal 404s, Splunk reports
    /// missing objects as 404s with explanatory bodies and, for some
    /// endpoints, as HTTP 500 with an embedded `MC_0050` application code;
    /// all of those become [`SplunkError::NotFound`] here. Matching on the
    /// body text replicates upstream API behavior and is known to be
    /// fragile, which is exactly why it is confined to this one function.
    fn classify(status: StatusCode, body: &str) -> Option<SplunkError> {
        if status.is_success() {
            return None;
        }
        let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        let lowered = snippet.to_lowercase();
        let absent = status == StatusCode::NOT_FOUND
            || lowered.contains("not found")
            || lowered.contains("could not find object")
            || snippet.contains("MC_0050");
        if absent {
            Some(SplunkError::NotFound(snippet))
        } else {
            Some(SplunkError::Http {
                status: status.as_u16(),
                body: snippet,
            })
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = self.authed(request).send().await.map_err(|e| {
            if e.is_timeout() {
                SplunkError::Transport(format!("request timed out: {e}"))
            } else if e.is_connect() {
                SplunkError::Transport(format!("connection failed: {e}"))
            } else {
                SplunkError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SplunkError::InvalidResponse(e.to_string()))?;

        if let Some(err) = Self::classify(status, &body) {
            debug!(status = status.as_u16(), "request failed");
            return Err(err);
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            SplunkError::InvalidResponse(format!(
                "undecodable body (status {status}): {e}: {}",
                body.chars().take(ERROR_BODY_LIMIT).collect::<String>()
            ))
        })
    }

    /// GET with query parameters.
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let url = self.url(path, query)?;
        debug!(%url, "GET");
        self.send(self.client.get(url)).await
    }

    /// POST with a JSON body.
    #[instrument(skip(self, query, body), fields(path = %path))]
    pub async fn post_json(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        debug!(%url, "POST");
        self.send(self.client.post(url).json(body)).await
    }

    /// PUT with a JSON body.
    #[instrument(skip(self, query, body), fields(path = %path))]
    pub async fn put_json(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        debug!(%url, "PUT");
        self.send(self.client.put(url).json(body)).await
    }

    /// POST with a form-urlencoded body, for the handful of legacy
    /// endpoints that do not accept JSON.
    #[instrument(skip(self, query, form), fields(path = %path))]
    pub async fn post_form(
        &self,
        path: &str,
        query: &[(String, String)],
        form: &[(String, String)],
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        debug!(%url, "POST (form)");
        self.send(self.client.post(url).form(form)).await
    }

    /// DELETE.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete(&self, path: &str) -> Result<Value> {
        let url = self.url(path, &[])?;
        debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await
    }
}
