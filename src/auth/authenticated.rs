//! Bearer token injection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use url::Url;

use crate::auth::refresher::TokenProvider;
use crate::http::client::{ByteStream, Headers, HttpClient};
use crate::http::error::TransportResult;
use crate::http::response::{find_header, Response};

/// Adds `Authorization: Bearer <token>` to every call.
///
/// A caller-supplied `authorization` header is left alone. The token is
/// read per call, so a retry after refresh carries the new one.
pub struct AuthenticatedClient {
    inner: Arc<dyn HttpClient>,
    tokens: Arc<dyn TokenProvider>,
}

impl AuthenticatedClient {
    pub fn new(inner: Arc<dyn HttpClient>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { inner, tokens }
    }

    fn authorize(&self, mut headers: Headers) -> Headers {
        if find_header(&headers, "authorization").is_none() {
            if let Some(token) = self.tokens.access_token() {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
        }
        headers
    }
}

#[async_trait]
impl HttpClient for AuthenticatedClient {
    async fn request(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> TransportResult<Response> {
        let headers = self.authorize(headers);
        self.inner.request(method, uri, headers, body, timeout).await
    }

    async fn request_stream(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> TransportResult<ByteStream> {
        let headers = self.authorize(headers);
        self.inner.request_stream(method, uri, headers, body).await
    }

    fn close(&self) {
        self.inner.close();
    }
}
