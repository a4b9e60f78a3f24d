//! Client-side HTTP transport stack for a single JSON backend.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller
//!     │
//!     ▼
//!  ┌───────────────┐  JSON encode/decode, status → TransportError,
//!  │   Transport   │  timeout, CancelToken
//!  └──────┬────────┘
//!         ▼
//!  ┌───────────────┐  proactive refresh, 401 → single-flight refresh
//!  │RefreshingClient│ → one retry
//!  └──────┬────────┘
//!         ▼
//!  ┌───────────────────┐  Authorization: Bearer <token>
//!  │AuthenticatedClient│
//!  └──────┬────────────┘
//!         ▼
//!  ┌────────────────┐  request ids, redacted lifecycle events → observers
//!  │ObservableClient│
//!  └──────┬─────────┘
//!         ▼
//!  ┌───────────────┐  reqwest (or any HttpClient)
//!  │  raw client   │
//!  └───────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod http;
pub mod observability;
pub mod security;
pub mod transport;

pub use crate::auth::{
    AuthenticatedClient, RefreshingClient, StaticToken, TokenProvider, TokenRefresher,
};
pub use crate::config::TransportConfig;
pub use crate::http::{HttpClient, Response, ReqwestTransport, TransportError, TransportResult};
pub use crate::observability::{HttpEvent, HttpObserver, ObservableClient};
pub use crate::transport::{CancelToken, RequestBody, RequestOptions, Transport, TransportBuilder};
