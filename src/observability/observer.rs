//! Observer contract and dispatch.
//!
//! # Design Decisions
//! - Observers are side-effect only; nothing they do feeds back into control flow
//! - A panicking observer is logged and skipped; the others still run
//! - No ordering is promised across concurrent calls

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::observability::events::{
    ErrorEvent, HttpEvent, RequestEvent, ResponseEvent, StreamEndEvent, StreamStartEvent,
};

/// Receives HTTP lifecycle events. Every method defaults to a no-op.
pub trait HttpObserver: Send + Sync {
    fn on_request(&self, _event: &RequestEvent) {}
    fn on_response(&self, _event: &ResponseEvent) {}
    fn on_error(&self, _event: &ErrorEvent) {}
    fn on_stream_start(&self, _event: &StreamStartEvent) {}
    fn on_stream_end(&self, _event: &StreamEndEvent) {}
}

/// Deliver `event` to every observer, isolating failures.
pub(crate) fn notify(observers: &[Arc<dyn HttpObserver>], event: &HttpEvent) {
    for observer in observers {
        let delivered = catch_unwind(AssertUnwindSafe(|| match event {
            HttpEvent::Request(e) => observer.on_request(e),
            HttpEvent::Response(e) => observer.on_response(e),
            HttpEvent::Error(e) => observer.on_error(e),
            HttpEvent::StreamStart(e) => observer.on_stream_start(e),
            HttpEvent::StreamEnd(e) => observer.on_stream_end(e),
        }));
        if delivered.is_err() {
            tracing::warn!(
                request_id = %event.request_id(),
                "HTTP observer panicked; event dropped for this observer"
            );
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<HttpEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<HttpEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events belonging to one call.
    pub fn events_for(&self, request_id: &str) -> Vec<HttpEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.request_id() == request_id)
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, event: HttpEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl HttpObserver for RecordingObserver {
    fn on_request(&self, event: &RequestEvent) {
        self.push(HttpEvent::Request(event.clone()));
    }

    fn on_response(&self, event: &ResponseEvent) {
        self.push(HttpEvent::Response(event.clone()));
    }

    fn on_error(&self, event: &ErrorEvent) {
        self.push(HttpEvent::Error(event.clone()));
    }

    fn on_stream_start(&self, event: &StreamStartEvent) {
        self.push(HttpEvent::StreamStart(event.clone()));
    }

    fn on_stream_end(&self, event: &StreamEndEvent) {
        self.push(HttpEvent::StreamEnd(event.clone()));
    }
}
