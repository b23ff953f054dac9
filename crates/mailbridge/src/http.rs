//! HTTP transport seam
//!
//! Provider services and the token manager talk to the network only through
//! the [`HttpClient`] trait so they can be constructed with any transport.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{MailError, Result};
use crate::models::Provider;

/// Maximum response body accepted (attachments are returned inline)
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Maximum length of a provider error body kept in error messages
const ERROR_BODY_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A single outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer_token: Option<String>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer_token: None,
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }
}

/// Status and body of a completed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Failure below the HTTP layer (DNS, TLS, connect, timeout)
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

/// Blocking HTTP transport
pub trait HttpClient: Send + Sync {
    /// Execute a request. Non-2xx statuses are returned as responses, not
    /// errors; only transport failures produce `Err`.
    fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Production transport backed by a shared `ureq::Agent`
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client enforcing `timeout` on every request
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl HttpClient for UreqClient {
    fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let auth = request
            .bearer_token
            .as_ref()
            .map(|token| format!("Bearer {}", token));

        let result = match request.method {
            Method::Get => authorize(self.agent.get(&request.url), auth.as_deref()).call(),
            Method::Delete => authorize(self.agent.delete(&request.url), auth.as_deref()).call(),
            Method::Post | Method::Patch => {
                let builder = match request.method {
                    Method::Post => self.agent.post(&request.url),
                    _ => self.agent.patch(&request.url),
                };
                let builder = authorize(builder, auth.as_deref());

                match &request.body {
                    RequestBody::Empty => builder.send_empty(),
                    RequestBody::Json(value) => {
                        let payload = serde_json::to_vec(value).map_err(|e| TransportError {
                            message: format!("Failed to encode request body: {}", e),
                            timed_out: false,
                        })?;
                        builder
                            .header("Content-Type", "application/json")
                            .send(&payload[..])
                    }
                    RequestBody::Form(pairs) => {
                        builder.send_form(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    }
                }
            }
        };

        let mut response = result.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(transport_error)?;

        Ok(HttpResponse { status, body })
    }
}

fn authorize<B>(builder: ureq::RequestBuilder<B>, auth: Option<&str>) -> ureq::RequestBuilder<B> {
    match auth {
        Some(value) => builder.header("Authorization", value),
        None => builder,
    }
}

fn transport_error(e: ureq::Error) -> TransportError {
    TransportError {
        timed_out: matches!(e, ureq::Error::Timeout(_)),
        message: e.to_string(),
    }
}

/// Execute a provider API request and classify the outcome
///
/// 2xx passes through; 401 becomes [`MailError::Unauthorized`]; 404 becomes
/// [`MailError::NotFound`] naming `resource`; everything else becomes
/// [`MailError::ProviderRequestFailed`].
pub(crate) fn send_checked(
    http: &dyn HttpClient,
    provider: Provider,
    operation: &'static str,
    resource: &str,
    request: HttpRequest,
) -> Result<HttpResponse> {
    log::debug!("{} {:?} {} ({})", provider, request.method, request.url, operation);

    let response = http.execute(&request).map_err(|e| MailError::Network {
        operation,
        message: e.message,
        timed_out: e.timed_out,
    })?;

    if response.is_success() {
        return Ok(response);
    }

    Err(match response.status {
        401 => MailError::Unauthorized {
            provider,
            operation,
        },
        404 => MailError::NotFound {
            provider,
            operation,
            resource: resource.to_string(),
        },
        status => MailError::ProviderRequestFailed {
            provider,
            operation,
            status,
            message: truncate_body(&response.body),
        },
    })
}

/// Decode a JSON response body
pub(crate) fn decode<T: DeserializeOwned>(operation: &'static str, response: &HttpResponse) -> Result<T> {
    response.json().map_err(|e| MailError::decode(operation, e))
}

/// Shorten a provider error body for inclusion in an error message
pub(crate) fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_MAX_LEN {
        return trimmed.to_string();
    }
    let mut shortened: String = trimmed.chars().take(ERROR_BODY_MAX_LEN).collect();
    shortened.push_str("...");
    shortened
}
