//! Metrics collection.
//!
//! # Metrics
//! - `http_client_requests_total` (counter): completed requests by method, status
//! - `http_client_errors_total` (counter): failures by error kind
//! - `http_client_request_duration_seconds` (histogram): latency distribution
//! - `http_client_stream_bytes_total` (counter): bytes received on streams
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the host picks the exporter
//! - Labels are low-cardinality (no URIs, no request ids)

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use http::Method;
use metrics::{counter, histogram};

use crate::observability::events::{ErrorEvent, RequestEvent, ResponseEvent, StreamEndEvent};
use crate::observability::observer::HttpObserver;

/// Observer that feeds the `metrics` facade.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    /// Method per in-flight request id, so responses can be labelled.
    methods: Mutex<HashMap<String, Method>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_method(&self, request_id: &str) -> String {
        self.methods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id)
            .map(|m| m.to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

impl HttpObserver for MetricsObserver {
    fn on_request(&self, event: &RequestEvent) {
        self.methods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event.request_id.clone(), event.method.clone());
    }

    fn on_response(&self, event: &ResponseEvent) {
        let method = self.take_method(&event.request_id);
        counter!(
            "http_client_requests_total",
            "method" => method,
            "status" => event.status_code.to_string()
        )
        .increment(1);
        histogram!("http_client_request_duration_seconds").record(event.duration.as_secs_f64());
    }

    fn on_error(&self, event: &ErrorEvent) {
        self.take_method(&event.request_id);
        counter!("http_client_errors_total", "kind" => event.exception.kind()).increment(1);
        histogram!("http_client_request_duration_seconds").record(event.duration.as_secs_f64());
    }

    fn on_stream_end(&self, event: &StreamEndEvent) {
        counter!("http_client_stream_bytes_total").increment(event.bytes_received as u64);
        if let Some(error) = &event.error {
            counter!("http_client_errors_total", "kind" => error.kind()).increment(1);
        }
    }
}
