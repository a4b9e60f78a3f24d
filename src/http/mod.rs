//! HTTP primitives shared by every layer.
//!
//! # Data Flow
//! ```text
//! Transport (typed API)
//!     → client.rs (HttpClient contract, one per layer)
//!     → raw.rs (reqwest, the only code touching sockets)
//!     ← response.rs (buffered Response value)
//!     ← error.rs (closed TransportError taxonomy)
//! ```
//!
//! # Design Decisions
//! - One object-safe trait for all layers so they stack as `Arc<dyn HttpClient>`
//! - Non-2xx statuses are responses, not errors, below the Transport façade
//! - Request ids come from an injected generator (request.rs)

pub mod client;
pub mod error;
pub mod raw;
pub mod request;
pub mod response;

pub use ::http::Method;
pub use client::{ByteStream, Headers, HttpClient};
pub use error::{TransportError, TransportResult};
pub use raw::ReqwestTransport;
pub use request::{RequestIdGenerator, SequentialRequestIds, UuidRequestIds};
pub use response::{find_header, Response};
