//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Log HTTP lifecycle events through an observer
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level
//! - Only redacted event data is ever logged

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::observability::events::{
    ErrorEvent, RequestEvent, ResponseEvent, StreamEndEvent, StreamStartEvent,
};
use crate::observability::observer::HttpObserver;

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let fallback = format!("backend_transport={}", config.log_level);
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Observer that writes every event to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HttpObserver for TracingObserver {
    fn on_request(&self, event: &RequestEvent) {
        tracing::debug!(
            request_id = %event.request_id,
            method = %event.method,
            uri = %event.uri,
            headers = ?event.headers,
            body = ?event.body,
            "HTTP request"
        );
    }

    fn on_response(&self, event: &ResponseEvent) {
        if event.status_code >= 400 {
            tracing::warn!(
                request_id = %event.request_id,
                status = event.status_code,
                duration_ms = event.duration.as_millis() as u64,
                body = ?event.body,
                "HTTP response with error status"
            );
        } else {
            tracing::debug!(
                request_id = %event.request_id,
                status = event.status_code,
                duration_ms = event.duration.as_millis() as u64,
                body_size = event.body_size,
                "HTTP response"
            );
        }
    }

    fn on_error(&self, event: &ErrorEvent) {
        tracing::warn!(
            request_id = %event.request_id,
            method = %event.method,
            uri = %event.uri,
            kind = event.exception.kind(),
            error = %event.exception,
            duration_ms = event.duration.as_millis() as u64,
            "HTTP request failed"
        );
    }

    fn on_stream_start(&self, event: &StreamStartEvent) {
        tracing::debug!(
            request_id = %event.request_id,
            method = %event.method,
            uri = %event.uri,
            "HTTP stream opened"
        );
    }

    fn on_stream_end(&self, event: &StreamEndEvent) {
        match &event.error {
            Some(error) => tracing::warn!(
                request_id = %event.request_id,
                bytes_received = event.bytes_received,
                duration_ms = event.duration.as_millis() as u64,
                kind = error.kind(),
                error = %error,
                "HTTP stream failed"
            ),
            None => tracing::debug!(
                request_id = %event.request_id,
                bytes_received = event.bytes_received,
                duration_ms = event.duration.as_millis() as u64,
                "HTTP stream closed"
            ),
        }
    }
}
