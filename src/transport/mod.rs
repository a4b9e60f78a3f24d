//! Transport subsystem: the public face of the stack.
//!
//! # Data Flow
//! ```text
//! caller
//!     → client.rs (Transport: resolve, encode, timeout, cancel, decode, map errors)
//!     → RefreshingClient → AuthenticatedClient → ObservableClient → raw
//!     ← stream.rs (cancellable byte streams)
//! ```
//!
//! # Design Decisions
//! - Every failure reaching the caller is a `TransportError`
//! - Cancellation is cooperative: it changes the result, not the I/O
//! - builder.rs is the one place that decides layer order

pub mod builder;
pub mod cancel;
pub mod client;
pub mod stream;

pub use self::builder::TransportBuilder;
pub use self::cancel::CancelToken;
pub use self::client::{RequestBody, RequestOptions, Transport, DEFAULT_TIMEOUT};
pub use self::stream::CancellableStream;
