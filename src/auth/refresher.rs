//! Auth capabilities consumed by the client layers.
//!
//! The auth layer owns token lifecycle; the transport stack only asks it
//! for the current token and to refresh when needed.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::http::error::TransportResult;

/// Refresh capability.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Whether the current token is expired or about to be.
    fn needs_refresh(&self) -> bool;

    /// Refresh proactively if the token is close to expiry.
    ///
    /// Best-effort and idempotent. Failures are handled internally; the
    /// request proceeds with whatever token is current afterwards.
    async fn refresh_if_expiring_soon(&self);

    /// Perform a refresh now. `Ok(false)` means the refresh was refused
    /// (e.g. refresh token revoked); `Err` means it could not be attempted.
    async fn try_refresh(&self) -> TransportResult<bool>;
}

/// Source of the bearer token sent on each request.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// A fixed token that never refreshes.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<Option<String>>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Replace the token, e.g. after an out-of-band login.
    pub fn set(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TokenRefresher for StaticToken {
    fn needs_refresh(&self) -> bool {
        false
    }

    async fn refresh_if_expiring_soon(&self) {}

    async fn try_refresh(&self) -> TransportResult<bool> {
        Ok(false)
    }
}
