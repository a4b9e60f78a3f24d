//! HTTP lifecycle events.
//!
//! All events of one call share a `request_id`. A buffered call ends with
//! exactly one `ResponseEvent` or `ErrorEvent`; a streaming call ends with
//! exactly one `StreamEndEvent`.

use std::time::{Duration, SystemTime};

use http::Method;
use serde_json::Value;
use url::Url;

use crate::http::client::Headers;
use crate::http::error::TransportError;

/// A request is about to be sent. Headers, uri and body are redacted.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub request_id: String,
    pub timestamp: SystemTime,
    pub method: Method,
    pub uri: Url,
    pub headers: Headers,
    pub body: Option<Value>,
}

/// A buffered request completed with a status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEvent {
    pub request_id: String,
    pub timestamp: SystemTime,
    pub status_code: u16,
    pub duration: Duration,
    pub body_size: usize,
    pub reason_phrase: Option<String>,
    pub headers: Option<Headers>,
    pub body: Option<Value>,
}

/// A buffered request failed before producing a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub request_id: String,
    pub timestamp: SystemTime,
    pub method: Method,
    pub uri: Url,
    pub exception: TransportError,
    pub duration: Duration,
}

/// A streaming request was subscribed to.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStartEvent {
    pub request_id: String,
    pub timestamp: SystemTime,
    pub method: Method,
    pub uri: Url,
    pub headers: Headers,
    pub body: Option<Value>,
}

/// A streaming request finished, successfully or not.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEndEvent {
    pub request_id: String,
    pub timestamp: SystemTime,
    pub bytes_received: usize,
    pub duration: Duration,
    /// Redacted text captured from the stream, bounded in size.
    pub body: Option<String>,
    pub error: Option<TransportError>,
}

impl StreamEndEvent {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Any lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpEvent {
    Request(RequestEvent),
    Response(ResponseEvent),
    Error(ErrorEvent),
    StreamStart(StreamStartEvent),
    StreamEnd(StreamEndEvent),
}

impl HttpEvent {
    pub fn request_id(&self) -> &str {
        match self {
            HttpEvent::Request(e) => &e.request_id,
            HttpEvent::Response(e) => &e.request_id,
            HttpEvent::Error(e) => &e.request_id,
            HttpEvent::StreamStart(e) => &e.request_id,
            HttpEvent::StreamEnd(e) => &e.request_id,
        }
    }

    /// Response, error and stream end close a call.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HttpEvent::Response(_) | HttpEvent::Error(_) | HttpEvent::StreamEnd(_)
        )
    }
}
