//! Typed transport façade.
//!
//! # Responsibilities
//! - Resolve request URIs against the backend base URL
//! - Encode JSON bodies and decode JSON responses
//! - Map non-2xx statuses onto `TransportError`
//! - Apply the request timeout and honour cancel tokens
//!
//! # State Transitions
//! ```text
//! pending → completed
//! pending → failed
//! pending → cancelled   (also when the call completed but the token was
//!                        cancelled before control came back)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::http::client::{ByteStream, Headers, HttpClient};
use crate::http::error::{TransportError, TransportResult};
use crate::http::response::{find_header, Response};
use crate::transport::cancel::CancelToken;
use crate::transport::stream::CancellableStream;

/// Timeout used when a request does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON; `content-type: application/json` is added unless
    /// the caller set a content type.
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
    pub cancel_token: Option<CancelToken>,
}

impl RequestOptions {
    /// Empty options: no body, default timeout, no cancel token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Send a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Send a text body as-is.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Send raw bytes.
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    /// Override the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancel token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

/// The public entry point for talking to the backend.
pub struct Transport {
    client: Arc<dyn HttpClient>,
    base_url: Option<Url>,
    default_timeout: Duration,
    closed: AtomicBool,
}

impl Transport {
    /// Wrap an assembled client stack.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            base_url: None,
            default_timeout: DEFAULT_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    /// Set the base URL for relative paths.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the timeout used when a request has none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Configured base URL, if any.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Timeout used when a request has none.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Absolute URIs are used as-is; anything else is joined onto the base URL.
    pub fn resolve(&self, uri: &str) -> TransportResult<Url> {
        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    TransportError::network(format!("Relative URI '{}' without a base URL", uri))
                })?;
                base.join(uri)
                    .map_err(|e| TransportError::network(format!("Invalid URI '{}': {}", uri, e)))
            }
            Err(e) => Err(TransportError::network(format!("Invalid URI '{}': {}", uri, e))),
        }
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::network("transport closed"));
        }
        Ok(())
    }

    /// Send a request and decode the response body.
    ///
    /// Returns `Value::Null` for 204 or empty bodies, decoded JSON when the
    /// body looks like JSON, and `Value::String` otherwise.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        options: RequestOptions,
    ) -> TransportResult<Value> {
        let RequestOptions {
            mut headers,
            body,
            timeout,
            cancel_token,
        } = options;

        if let Some(token) = &cancel_token {
            token.check()?;
        }
        self.ensure_open()?;

        let uri = self.resolve(uri)?;
        let body = encode_body(&mut headers, body);
        let timeout = timeout.unwrap_or(self.default_timeout);

        let result = self
            .client
            .request(method.clone(), uri.clone(), headers, body, Some(timeout))
            .await;

        // Cancelled while in flight: whatever came back is stale.
        if let Some(token) = &cancel_token {
            if let Err(err) = token.check() {
                tracing::debug!(
                    method = %method,
                    path = %uri.path(),
                    "Discarding result of cancelled request"
                );
                return Err(err);
            }
        }

        let response = result?;
        if !response.is_success() {
            return Err(TransportError::from_status(
                response.status_code(),
                &response.body(),
                uri.path(),
            ));
        }
        decode_body(&response)
    }

    /// Send a request and convert the decoded body with `from_json`.
    pub async fn request_with<T, F>(
        &self,
        method: Method,
        uri: &str,
        options: RequestOptions,
        from_json: F,
    ) -> TransportResult<T>
    where
        F: FnOnce(Value) -> T,
    {
        self.request(method, uri, options).await.map(from_json)
    }

    /// Send a request and deserialize the body into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        uri: &str,
        options: RequestOptions,
    ) -> TransportResult<T> {
        let value = self.request(method, uri, options).await?;
        serde_json::from_value(value.clone()).map_err(|e| TransportError::Api {
            status_code: 200,
            message: format!("Unexpected response shape: {}", e),
            server_message: None,
            body: Some(value.to_string()),
        })
    }

    pub async fn get(&self, uri: &str, options: RequestOptions) -> TransportResult<Value> {
        self.request(Method::GET, uri, options).await
    }

    pub async fn post(&self, uri: &str, options: RequestOptions) -> TransportResult<Value> {
        self.request(Method::POST, uri, options).await
    }

    pub async fn put(&self, uri: &str, options: RequestOptions) -> TransportResult<Value> {
        self.request(Method::PUT, uri, options).await
    }

    pub async fn patch(&self, uri: &str, options: RequestOptions) -> TransportResult<Value> {
        self.request(Method::PATCH, uri, options).await
    }

    pub async fn delete(&self, uri: &str, options: RequestOptions) -> TransportResult<Value> {
        self.request(Method::DELETE, uri, options).await
    }

    /// Open a streaming request.
    ///
    /// With a cancel token, the returned stream ends with
    /// `TransportError::Cancelled` once the token is cancelled. The
    /// options' timeout does not apply to streams.
    pub async fn request_stream(
        &self,
        method: Method,
        uri: &str,
        options: RequestOptions,
    ) -> TransportResult<ByteStream> {
        let RequestOptions {
            mut headers,
            body,
            cancel_token,
            ..
        } = options;

        if let Some(token) = &cancel_token {
            token.check()?;
        }
        self.ensure_open()?;

        let uri = self.resolve(uri)?;
        let body = encode_body(&mut headers, body);
        let stream = self
            .client
            .request_stream(method, uri, headers, body)
            .await?;

        match cancel_token {
            Some(token) => Ok(Box::pin(CancellableStream::new(stream, token))),
            None => Ok(stream),
        }
    }

    /// Release the underlying client. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Transport closed");
            self.client.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn encode_body(headers: &mut Headers, body: Option<RequestBody>) -> Option<Bytes> {
    match body? {
        RequestBody::Json(value) => {
            if find_header(headers, "content-type").is_none() {
                headers.insert("content-type".to_string(), "application/json".to_string());
            }
            Some(Bytes::from(value.to_string()))
        }
        RequestBody::Text(text) => Some(Bytes::from(text)),
        RequestBody::Bytes(bytes) => Some(bytes),
    }
}

fn decode_body(response: &Response) -> TransportResult<Value> {
    if response.status_code() == 204 || response.body_bytes().is_empty() {
        return Ok(Value::Null);
    }

    let text = response.body();
    let trimmed = text.trim_start();
    let looks_json = trimmed.starts_with('{')
        || trimmed.starts_with('[')
        || response
            .content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    if !looks_json {
        return Ok(Value::String(text));
    }

    serde_json::from_str(&text).map_err(|e| TransportError::Api {
        status_code: response.status_code(),
        message: format!("Invalid JSON response: {}", e),
        server_message: None,
        body: Some(text.clone()),
    })
}
