//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Transport
//!     → refreshing.rs (proactive refresh, 401 → single-flight refresh → one retry)
//!     → authenticated.rs (inject Authorization: Bearer <token>)
//!     → ObservableClient (header redacted before anyone sees it)
//! ```
//!
//! # Design Decisions
//! - Token lifecycle lives behind `TokenRefresher`/`TokenProvider`
//! - Token injection sits below refresh so a retry reads the new token
//! - Injection sits above observation so tokens are never observed in clear

pub mod authenticated;
pub mod refresher;
pub mod refreshing;

pub use self::authenticated::AuthenticatedClient;
pub use self::refresher::{StaticToken, TokenProvider, TokenRefresher};
pub use self::refreshing::RefreshingClient;
