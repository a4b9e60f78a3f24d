//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! ObservableClient builds an event
//!     → redact.rs (headers, query string, JSON/form/SSE bodies)
//!     → observers only ever see the redacted copy
//! ```
//!
//! # Design Decisions
//! - Redaction applies to observation only; requests and responses
//!   travel through the stack untouched
//! - Errors are never redacted; their messages are already safe

pub mod redact;

pub use redact::{
    redact_body_bytes, redact_headers, redact_json_body, redact_sse_content, redact_string,
    redact_uri, AUTH_ENDPOINT_REDACTED, REDACTED,
};
