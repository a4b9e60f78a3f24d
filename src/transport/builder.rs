//! Stack assembly.
//!
//! # Data Flow
//! ```text
//! raw client
//!     → ObservableClient (observers, request ids, capture limit)
//!     → AuthenticatedClient (if a token provider is set)
//!     → RefreshingClient (if a refresher is set)
//!     → Transport
//! ```

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::{AuthenticatedClient, RefreshingClient, TokenProvider, TokenRefresher};
use crate::config::TransportConfig;
use crate::http::client::HttpClient;
use crate::http::error::{TransportError, TransportResult};
use crate::http::request::RequestIdGenerator;
use crate::observability::{HttpObserver, MetricsObserver, ObservableClient, DEFAULT_CAPTURE_LIMIT};
use crate::transport::client::{Transport, DEFAULT_TIMEOUT};

/// Builds a [`Transport`] on top of a raw client.
pub struct TransportBuilder {
    raw: Arc<dyn HttpClient>,
    base_url: Option<Url>,
    timeout: Duration,
    observers: Vec<Arc<dyn HttpObserver>>,
    request_ids: Option<Arc<dyn RequestIdGenerator>>,
    capture_limit: usize,
    token_provider: Option<Arc<dyn TokenProvider>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl TransportBuilder {
    /// Start from the raw client with default settings.
    pub fn new(raw: Arc<dyn HttpClient>) -> Self {
        Self {
            raw,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            observers: Vec::new(),
            request_ids: None,
            capture_limit: DEFAULT_CAPTURE_LIMIT,
            token_provider: None,
            refresher: None,
        }
    }

    /// Start from a validated configuration.
    pub fn from_config(
        raw: Arc<dyn HttpClient>,
        config: &TransportConfig,
    ) -> TransportResult<Self> {
        let base_url = Url::parse(&config.backend.base_url).map_err(|e| {
            TransportError::network(format!(
                "Invalid base URL '{}': {}",
                config.backend.base_url, e
            ))
        })?;

        let mut builder = Self::new(raw)
            .base_url(base_url)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .capture_limit(config.observability.stream_capture_limit_bytes);
        if config.observability.metrics_enabled {
            builder = builder.observer(Arc::new(MetricsObserver::new()));
        }
        Ok(builder)
    }

    /// Base URL that relative paths are joined onto.
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Default per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an observer of redacted traffic.
    pub fn observer(mut self, observer: Arc<dyn HttpObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Use a custom request id generator.
    pub fn request_ids(mut self, request_ids: Arc<dyn RequestIdGenerator>) -> Self {
        self.request_ids = Some(request_ids);
        self
    }

    /// Cap on captured stream bytes.
    pub fn capture_limit(mut self, limit: usize) -> Self {
        self.capture_limit = limit;
        self
    }

    /// Source of the bearer token.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Enable proactive and reactive token refresh.
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Assemble the layered client.
    pub fn build(self) -> Transport {
        let mut observable = ObservableClient::new(self.raw)
            .with_observers(self.observers)
            .with_capture_limit(self.capture_limit);
        if let Some(request_ids) = self.request_ids {
            observable = observable.with_request_ids(request_ids);
        }

        let mut client: Arc<dyn HttpClient> = Arc::new(observable);
        if let Some(provider) = self.token_provider {
            client = Arc::new(AuthenticatedClient::new(client, provider));
        }
        if let Some(refresher) = self.refresher {
            client = Arc::new(RefreshingClient::new(client, refresher));
        }

        let mut transport = Transport::new(client).with_default_timeout(self.timeout);
        if let Some(base_url) = self.base_url {
            transport = transport.with_base_url(base_url);
        }
        transport
    }
}
