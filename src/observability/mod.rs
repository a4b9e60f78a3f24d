//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! ObservableClient (client.rs)
//!     → events.rs (RequestEvent, ResponseEvent, ErrorEvent, StreamStart/End)
//!     → observer.rs (fan-out, one panic never reaches the caller)
//!     → logging.rs (TracingObserver)
//!     → metrics.rs (MetricsObserver)
//! ```
//!
//! # Design Decisions
//! - Request ID correlates every event of one call
//! - Events carry redacted copies only
//! - Observation never changes what the caller receives

pub mod client;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod observer;

pub use self::client::{ObservableClient, DEFAULT_CAPTURE_LIMIT};
pub use self::events::{
    ErrorEvent, HttpEvent, RequestEvent, ResponseEvent, StreamEndEvent, StreamStartEvent,
};
pub use self::logging::{init_logging, TracingObserver};
pub use self::metrics::MetricsObserver;
pub use self::observer::{HttpObserver, RecordingObserver};
