//! Request identity.
//!
//! # Responsibilities
//! - Generate one id per logical call (UUID v4 by default)
//! - Allow deterministic generators for tests
//!
//! # Design Decisions
//! - Generator is injected at construction, never global
//! - Retries inside the stack get their own id; each is a separate call on the wire

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of request ids.
pub trait RequestIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

impl<F> RequestIdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_id(&self) -> String {
        self()
    }
}

/// Random UUID v4 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidRequestIds;

impl RequestIdGenerator for UuidRequestIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialRequestIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialRequestIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl RequestIdGenerator for SequentialRequestIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
