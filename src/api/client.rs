use crate::config::Config;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024; // 5MB

/// Errors from a single API request.
///
/// The feed service treats every variant the same way (the request failed);
/// the detail only ends up in logs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Body was not the JSON shape the call site asked for
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Thin wrapper around `reqwest::Client` bound to one API root.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    max_response_bytes: usize,
}

impl ApiClient {
    /// Create a client for `base_url` with default timeout and body limit.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }

    /// Create a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let mut client = Self::new(&config.api_base_url)?;
        client.timeout = Duration::from_secs(config.request_timeout_secs);
        client.max_response_bytes = config.max_response_bytes;
        Ok(client)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue a `GET` against `path` (relative to the API root) and decode the
    /// JSON body as `T`.
    ///
    /// `call_site` names the caller in logs. Every call performs a fresh
    /// request, which is what lets [`super::retry`] re-run it.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Timeout`] - the request exceeded the configured timeout
    /// - [`ApiError::Network`] - connection or TLS failure
    /// - [`ApiError::HttpStatus`] - non-2xx response
    /// - [`ApiError::ResponseTooLarge`] - body exceeded the configured limit
    /// - [`ApiError::Decode`] - body was not valid JSON for `T`
    pub async fn get<T: DeserializeOwned>(
        &self,
        call_site: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, params)?;
        tracing::debug!(call_site, url = %url, "GET");

        let timeout_secs = self.timeout.as_secs();
        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| ApiError::Timeout(timeout_secs))?
            .map_err(ApiError::Network)?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, self.max_response_bytes).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Join `path` onto the API root, keeping any path prefix the root has.
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
    let url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl(format!(
            "unsupported scheme '{}' (expected http or https)",
            other
        ))),
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
