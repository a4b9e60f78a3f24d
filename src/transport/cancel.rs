//! Cooperative cancellation.
//!
//! # States
//! ```text
//! Active → Cancelled(reason)    (once; later cancels are no-ops)
//! ```
//!
//! # Design Decisions
//! - Owned by the caller; the transport only reads it
//! - Cancelling does not abort network I/O already in flight, it only
//!   decides what the caller gets back

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::http::error::{TransportError, TransportResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CancelState {
    Active,
    Cancelled(Option<String>),
}

/// Caller-owned cancellation handle. Clones share state.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<CancelState>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CancelState::Active);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Cancel the token. Returns `false` if it was already cancelled,
    /// in which case the original reason is kept.
    pub fn cancel(&self, reason: Option<&str>) -> bool {
        let reason = reason.map(ToString::to_string);
        self.state.send_if_modified(|state| match state {
            CancelState::Active => {
                *state = CancelState::Cancelled(reason);
                true
            }
            CancelState::Cancelled(_) => false,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.state.borrow(), CancelState::Cancelled(_))
    }

    pub fn reason(&self) -> Option<String> {
        match &*self.state.borrow() {
            CancelState::Cancelled(reason) => reason.clone(),
            CancelState::Active => None,
        }
    }

    /// `Err(Cancelled)` once the token has been cancelled.
    pub fn check(&self) -> TransportResult<()> {
        match &*self.state.borrow() {
            CancelState::Cancelled(reason) => Err(TransportError::cancelled(reason.clone())),
            CancelState::Active => Ok(()),
        }
    }

    /// Resolves with the reason once the token is cancelled.
    pub async fn cancelled(&self) -> Option<String> {
        let mut rx = self.state.subscribe();
        let reason = match rx
            .wait_for(|state| matches!(state, CancelState::Cancelled(_)))
            .await
        {
            Ok(state) => match &*state {
                CancelState::Cancelled(reason) => reason.clone(),
                CancelState::Active => None,
            },
            // The sender lives as long as `self`, so this is unreachable.
            Err(_) => None,
        };
        reason
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
