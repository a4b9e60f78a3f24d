//! Token refresh around requests.
//!
//! # Responsibilities
//! - Proactive refresh before every call
//! - Reactive refresh and a single retry on 401
//! - Share one refresh among concurrent 401s (single-flight)
//!
//! # State Transitions
//! ```text
//! request → 2xx/other          → return
//! request → 401 (first)        → refresh → ok   → retry once → return
//!                                        → fail → return original 401
//! request → 401 (retry)        → return
//! ```
//!
//! # Design Decisions
//! - The retry flag is local to the call, never shared
//! - The in-flight refresh is the only shared state. It runs as a spawned
//!   task and clears itself on resolution so the next 401 starts a fresh cycle
//! - Streams get the proactive refresh only: once a stream has started its
//!   status is committed and it cannot be replayed

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use http::Method;
use url::Url;

use crate::auth::refresher::TokenRefresher;
use crate::http::client::{ByteStream, Headers, HttpClient};
use crate::http::error::{TransportError, TransportResult};
use crate::http::response::Response;

type RefreshFuture = Shared<BoxFuture<'static, TransportResult<bool>>>;

/// The refresh currently running, tagged so only it can clear its own slot.
struct InFlight {
    generation: u64,
    refresh: RefreshFuture,
}

/// Clears the slot when the refresh task ends, including by panic.
struct SlotGuard {
    state: Arc<Mutex<Option<InFlight>>>,
    generation: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slot = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|f| f.generation == self.generation) {
            *slot = None;
        }
    }
}

/// Wraps a client with proactive and reactive token refresh.
pub struct RefreshingClient {
    inner: Arc<dyn HttpClient>,
    refresher: Arc<dyn TokenRefresher>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    generations: AtomicU64,
}

impl RefreshingClient {
    /// Wrap `inner`, refreshing through `refresher`.
    pub fn new(inner: Arc<dyn HttpClient>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            inner,
            refresher,
            in_flight: Arc::new(Mutex::new(None)),
            generations: AtomicU64::new(0),
        }
    }

    /// Whether a reactive refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Join the running refresh, or start one.
    ///
    /// The refresh runs as its own task, so it completes and frees the slot
    /// even when every waiter has been dropped.
    async fn refresh_once(&self) -> TransportResult<bool> {
        let refresh = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(in_flight) => {
                    tracing::debug!(
                        generation = in_flight.generation,
                        "Joining in-flight token refresh"
                    );
                    in_flight.refresh.clone()
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
                    let refresher = Arc::clone(&self.refresher);
                    let guard = SlotGuard {
                        state: Arc::clone(&self.in_flight),
                        generation,
                    };
                    // Holding the slot lock here keeps the task from clearing
                    // the slot before it is filled.
                    let task = tokio::spawn(async move {
                        let _guard = guard;
                        tracing::debug!(generation, "Refreshing token after 401");
                        refresher.try_refresh().await
                    });
                    let refresh = task
                        .map(|joined| {
                            joined.unwrap_or_else(|e| {
                                tracing::error!(error = %e, "Token refresh task failed");
                                Err(TransportError::network(format!(
                                    "Token refresh task failed: {}",
                                    e
                                )))
                            })
                        })
                        .boxed()
                        .shared();
                    *slot = Some(InFlight {
                        generation,
                        refresh: refresh.clone(),
                    });
                    refresh
                }
            }
        };
        refresh.await
    }
}

#[async_trait]
impl HttpClient for RefreshingClient {
    async fn request(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> TransportResult<Response> {
        self.refresher.refresh_if_expiring_soon().await;

        let mut is_retry = false;
        loop {
            let response = self
                .inner
                .request(method.clone(), uri.clone(), headers.clone(), body.clone(), timeout)
                .await?;

            if response.status_code() != 401 || is_retry {
                return Ok(response);
            }

            match self.refresh_once().await {
                Ok(true) => {
                    tracing::debug!(uri = %uri.path(), "Token refreshed, retrying request");
                    is_retry = true;
                }
                Ok(false) => {
                    tracing::info!(uri = %uri.path(), "Token refresh refused, returning 401");
                    return Ok(response);
                }
                Err(err) => {
                    tracing::warn!(uri = %uri.path(), error = %err, "Token refresh failed");
                    return Err(err);
                }
            }
        }
    }

    async fn request_stream(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> TransportResult<ByteStream> {
        self.refresher.refresh_if_expiring_soon().await;
        self.inner.request_stream(method, uri, headers, body).await
    }

    fn close(&self) {
        self.inner.close();
    }
}
