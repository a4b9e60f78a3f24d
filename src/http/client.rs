//! The client contract shared by every layer of the stack.
//!
//! # Data Flow
//! ```text
//! Transport → RefreshingClient → AuthenticatedClient → ObservableClient → raw
//! ```
//! Each arrow is an `Arc<dyn HttpClient>`.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use http::Method;
use url::Url;

use crate::http::error::TransportResult;
use crate::http::response::Response;

/// Plain header map. Lookups should go through [`find_header`](crate::http::response::find_header).
pub type Headers = HashMap<String, String>;

/// Live response body for streaming calls.
pub type ByteStream = Pin<Box<dyn Stream<Item = TransportResult<Bytes>> + Send>>;

/// A byte-oriented HTTP client.
///
/// Implementations report transport failures as
/// [`TransportError::Network`](crate::http::TransportError::Network) and
/// return non-2xx statuses as ordinary responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform one buffered request. `timeout` must be honoured by whoever
    /// talks to the socket.
    async fn request(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> TransportResult<Response>;

    /// Open a streaming request.
    async fn request_stream(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> TransportResult<ByteStream>;

    /// Release underlying resources. Idempotent.
    fn close(&self);
}
