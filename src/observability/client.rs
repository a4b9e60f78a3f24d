//! Observable client layer.
//!
//! # Responsibilities
//! - Tag every call with a request id
//! - Emit redacted lifecycle events to registered observers
//! - Pass responses, errors and stream chunks through unchanged
//!
//! # Design Decisions
//! - Streams are lazy: nothing is opened or emitted until first poll
//! - Stream capture keeps the first `capture_limit` bytes, drops the rest
//! - A call dropped mid-flight still gets its terminal event

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt, TryStreamExt};
use http::Method;
use serde_json::Value;
use url::Url;

use crate::http::client::{ByteStream, Headers, HttpClient};
use crate::http::error::{TransportError, TransportResult};
use crate::http::request::{RequestIdGenerator, UuidRequestIds};
use crate::http::response::Response;
use crate::observability::events::{
    ErrorEvent, HttpEvent, RequestEvent, ResponseEvent, StreamEndEvent, StreamStartEvent,
};
use crate::observability::observer::{notify, HttpObserver};
use crate::security::redact::{
    redact_body_bytes, redact_headers, redact_json_body, redact_sse_content, redact_string,
    redact_uri,
};

/// Default cap on captured stream text.
pub const DEFAULT_CAPTURE_LIMIT: usize = 500 * 1024;

/// Wraps a client and reports what passes through it.
pub struct ObservableClient {
    inner: Arc<dyn HttpClient>,
    observers: Vec<Arc<dyn HttpObserver>>,
    request_ids: Arc<dyn RequestIdGenerator>,
    capture_limit: usize,
}

impl ObservableClient {
    /// Wrap `inner` with no observers and UUID request ids.
    pub fn new(inner: Arc<dyn HttpClient>) -> Self {
        Self {
            inner,
            observers: Vec::new(),
            request_ids: Arc::new(UuidRequestIds),
            capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }

    /// Add one observer.
    pub fn with_observer(mut self, observer: Arc<dyn HttpObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Add several observers, notified in order.
    pub fn with_observers<I>(mut self, observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn HttpObserver>>,
    {
        self.observers.extend(observers);
        self
    }

    /// Replace the request id generator.
    pub fn with_request_ids(mut self, request_ids: Arc<dyn RequestIdGenerator>) -> Self {
        self.request_ids = request_ids;
        self
    }

    /// Cap how many stream bytes are captured for the end event.
    pub fn with_capture_limit(mut self, limit: usize) -> Self {
        self.capture_limit = limit;
        self
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

/// Emits an `ErrorEvent` if the call is dropped before it resolves.
struct PendingCall<'a> {
    observers: &'a [Arc<dyn HttpObserver>],
    request_id: String,
    method: Method,
    uri: Url,
    started: Instant,
    resolved: bool,
}

impl PendingCall<'_> {
    fn resolve(&mut self, event: HttpEvent) {
        self.resolved = true;
        notify(self.observers, &event);
    }

    fn error_event(&self, exception: TransportError) -> HttpEvent {
        HttpEvent::Error(ErrorEvent {
            request_id: self.request_id.clone(),
            timestamp: SystemTime::now(),
            method: self.method.clone(),
            uri: self.uri.clone(),
            exception,
            duration: self.started.elapsed(),
        })
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            let event = self.error_event(TransportError::cancelled(Some(
                "request dropped before completion".into(),
            )));
            notify(self.observers, &event);
        }
    }
}

fn redact_response_body(response: &Response, uri: &Url) -> Option<Value> {
    let is_sse = response
        .content_type()
        .is_some_and(|ct| ct.contains("text/event-stream"));
    if is_sse && !response.body_bytes().is_empty() {
        return Some(Value::String(redact_sse_content(&response.body(), uri)));
    }
    redact_body_bytes(response.body_bytes(), uri)
}

/// Redact captured stream text: JSON, then SSE, then form text.
fn redact_captured(text: &str, uri: &Url) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(text) {
        return match redact_json_body(&json, uri) {
            Value::String(s) => s,
            other => other.to_string(),
        };
    }
    if text.contains("data:") {
        return redact_sse_content(text, uri);
    }
    redact_string(text, uri)
}

#[async_trait]
impl HttpClient for ObservableClient {
    async fn request(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> TransportResult<Response> {
        let request_id = self.request_ids.next_id();
        let redacted_uri = redact_uri(&uri);

        notify(
            &self.observers,
            &HttpEvent::Request(RequestEvent {
                request_id: request_id.clone(),
                timestamp: SystemTime::now(),
                method: method.clone(),
                uri: redacted_uri.clone(),
                headers: redact_headers(&headers),
                body: body.as_deref().and_then(|b| redact_body_bytes(b, &uri)),
            }),
        );

        let mut pending = PendingCall {
            observers: &self.observers,
            request_id: request_id.clone(),
            method: method.clone(),
            uri: redacted_uri,
            started: Instant::now(),
            resolved: false,
        };

        match self
            .inner
            .request(method, uri.clone(), headers, body, timeout)
            .await
        {
            Ok(response) => {
                let event = HttpEvent::Response(ResponseEvent {
                    request_id,
                    timestamp: SystemTime::now(),
                    status_code: response.status_code(),
                    duration: pending.started.elapsed(),
                    body_size: response.body_bytes().len(),
                    reason_phrase: response.reason_phrase().map(ToString::to_string),
                    headers: Some(redact_headers(response.headers())),
                    body: redact_response_body(&response, &uri),
                });
                pending.resolve(event);
                Ok(response)
            }
            Err(err) => {
                let event = pending.error_event(err.clone());
                pending.resolve(event);
                Err(err)
            }
        }
    }

    async fn request_stream(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> TransportResult<ByteStream> {
        let start = StreamStartEvent {
            request_id: self.request_ids.next_id(),
            timestamp: SystemTime::now(),
            method: method.clone(),
            uri: redact_uri(&uri),
            headers: redact_headers(&headers),
            body: body.as_deref().and_then(|b| redact_body_bytes(b, &uri)),
        };

        let inner = Arc::clone(&self.inner);
        let target = uri.clone();
        let upstream = stream::once(async move {
            inner.request_stream(method, target, headers, body).await
        })
        .try_flatten()
        .boxed();

        Ok(Box::pin(ObservedStream {
            upstream,
            observers: self.observers.clone(),
            uri,
            request_id: start.request_id.clone(),
            start: Some(start),
            started: None,
            bytes_received: 0,
            captured: Vec::new(),
            capture_limit: self.capture_limit,
            finished: false,
        }))
    }

    fn close(&self) {
        self.inner.close();
    }
}

/// Stream wrapper that emits start/end events around the upstream bytes.
struct ObservedStream {
    upstream: ByteStream,
    observers: Vec<Arc<dyn HttpObserver>>,
    uri: Url,
    /// Taken and emitted on first poll.
    start: Option<StreamStartEvent>,
    request_id: String,
    started: Option<Instant>,
    bytes_received: usize,
    captured: Vec<u8>,
    capture_limit: usize,
    finished: bool,
}

impl ObservedStream {
    fn begin(&mut self) {
        if let Some(mut event) = self.start.take() {
            event.timestamp = SystemTime::now();
            self.started = Some(Instant::now());
            notify(&self.observers, &HttpEvent::StreamStart(event));
        }
    }

    fn capture(&mut self, chunk: &[u8]) {
        let room = self.capture_limit.saturating_sub(self.captured.len());
        if room > 0 {
            let take = room.min(chunk.len());
            self.captured.extend_from_slice(&chunk[..take]);
        }
    }

    fn finish(&mut self, error: Option<TransportError>) {
        if self.finished {
            return;
        }
        self.finished = true;

        if self.bytes_received > self.capture_limit {
            tracing::debug!(
                request_id = %self.request_id,
                bytes_received = self.bytes_received,
                capture_limit = self.capture_limit,
                "Stream capture truncated"
            );
        }

        let body = if self.captured.is_empty() {
            None
        } else {
            let text = String::from_utf8_lossy(&self.captured);
            Some(redact_captured(&text, &self.uri))
        };

        let event = StreamEndEvent {
            request_id: self.request_id.clone(),
            timestamp: SystemTime::now(),
            bytes_received: self.bytes_received,
            duration: self.started.map(|s| s.elapsed()).unwrap_or_default(),
            body,
            error,
        };
        notify(&self.observers, &HttpEvent::StreamEnd(event));
    }
}

impl Stream for ObservedStream {
    type Item = TransportResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        this.begin();

        match this.upstream.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_received += chunk.len();
                this.capture(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.finish(Some(err.clone()));
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finish(None);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for ObservedStream {
    fn drop(&mut self) {
        if self.started.is_some() && !self.finished {
            self.finish(Some(TransportError::cancelled(Some(
                "stream dropped by consumer".into(),
            ))));
        }
    }
}
