//! HTTP delegate backed by reqwest.
//!
//! - rustls TLS, gzip/brotli/deflate content decoding
//! - Max redirects: 5 (configurable)
//! - Max body bytes: 5MB (configurable)
//! - Bodies are streamed lazily; the connection and its decoder stay
//!   attached to the response until it is materialized.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderName, HeaderValue};
use reqwest::Client;
use replay_core::{ConfigError, Error};
use serde::{Deserialize, Serialize};

use crate::delegate::{Delegate, FromConfig, RequestOptions};
use crate::http::{DecodedBody, LiveBody, Request, Response, declared_charset};

/// Configuration for the HTTP delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// User agent string (default: "replay/0.1")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Request timeout in milliseconds (default: 20000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Honour HTTP_PROXY/HTTPS_PROXY from the environment (default: true)
    #[serde(default = "default_true")]
    pub system_proxy: bool,
}

fn default_user_agent() -> String {
    "replay/0.1".into()
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            system_proxy: true,
        }
    }
}

impl AgentConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}

/// HTTP delegate performing real network exchanges.
pub struct HttpAgent {
    http: Client,
    config: AgentConfig,
}

impl HttpAgent {
    /// Create a new agent with the given configuration.
    pub fn new(config: AgentConfig) -> Result<Self, Error> {
        config.validate()?;

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        let http = builder
            .build()
            .map_err(|e| Error::Delegate(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn build(&self, request: &Request, options: &RequestOptions) -> Result<reqwest::RequestBuilder, Error> {
        let mut builder = self.http.request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("header name {name:?}: {e}")))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| Error::InvalidRequest(format!("header {name}: {e}")))?;
            builder = builder.header(header_name, header_value);
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder)
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::HttpError(format!("network error: {err}"))
    }
}

#[async_trait]
impl Delegate for HttpAgent {
    /// Send the request and return as soon as the status line and headers
    /// arrive. Non-2xx statuses are responses, not errors.
    async fn perform_request(&mut self, request: &Request, options: &RequestOptions) -> Result<Response, Error> {
        let start = Instant::now();
        let response = self.build(request, options)?.send().await.map_err(network_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let version = format!("{:?}", response.version());
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "received response headers"
        );

        let body = ReqwestBody { inner: response, max_bytes: self.config.max_bytes };
        let mut out = Response::streaming(status.as_u16(), headers, Box::new(body))
            .with_version(version)
            .with_url(final_url);
        if let Some(reason) = status.canonical_reason() {
            out = out.with_reason(reason);
        }
        Ok(out)
    }
}

impl FromConfig for HttpAgent {
    type Config = AgentConfig;

    fn from_config(config: AgentConfig) -> Result<Self, Error> {
        Self::new(config)
    }
}

/// The unread body of a reqwest response.
///
/// reqwest strips `Content-Encoding` when it installs its decoder, so only
/// charset transcoding is reported back.
struct ReqwestBody {
    inner: reqwest::Response,
    max_bytes: usize,
}

#[async_trait]
impl LiveBody for ReqwestBody {
    async fn read_to_end(self: Box<Self>) -> Result<DecodedBody, Error> {
        let ReqwestBody { inner, max_bytes } = *self;

        let charset = inner
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(declared_charset);
        let transcode = charset.is_some_and(|c| !matches!(c.as_str(), "utf-8" | "utf8" | "us-ascii"));

        let bytes = if transcode {
            Bytes::from(inner.text().await.map_err(network_error)?)
        } else {
            inner.bytes().await.map_err(network_error)?
        };

        if bytes.len() > max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), max_bytes)));
        }

        Ok(DecodedBody { bytes, content_decoded: false, charset_decoded: transcode })
    }
}
