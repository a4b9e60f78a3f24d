//! Default raw transport backed by reqwest.
//!
//! # Responsibilities
//! - Send requests over a pooled reqwest client
//! - Enforce the per-request timeout it is handed
//! - Map connection and timeout failures to `TransportError::Network`

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http::Method;
use url::Url;

use crate::http::client::{ByteStream, Headers, HttpClient};
use crate::http::error::{TransportError, TransportResult};
use crate::http::response::Response;

/// Raw transport talking to the network through reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    closed: AtomicBool,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::network("client closed"));
        }
        Ok(())
    }

    fn build(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, uri);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(format!("Request timed out: {}", err))
    } else {
        TransportError::network(format!("Network error: {}", err))
    }
}

#[async_trait]
impl HttpClient for ReqwestTransport {
    async fn request(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> TransportResult<Response> {
        self.ensure_open()?;

        let mut builder = self.build(method, uri, headers, body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        let mut result = Response::new(status.as_u16(), body).with_headers(headers);
        if let Some(reason) = status.canonical_reason() {
            result = result.with_reason_phrase(reason);
        }
        Ok(result)
    }

    async fn request_stream(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> TransportResult<ByteStream> {
        self.ensure_open()?;

        let response = self
            .build(method, uri, headers, body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let resource = response.url().path().to_string();
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), &text, &resource));
        }

        Ok(Box::pin(response.bytes_stream().map_err(map_reqwest_error)))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Raw transport closed");
        }
    }
}
