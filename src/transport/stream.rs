//! Cancellable byte streams.
//!
//! A stream is paused simply by not polling it; upstream data waits in the
//! upstream (socket or channel) rather than being dropped. Cancellation is
//! checked before every delivery, so a stream cancelled while paused yields
//! `Cancelled` on its next poll instead of the buffered data.
//!
//! Cancelling releases the upstream, which for an observed stream is the
//! observation layer. Its end event therefore records the generic
//! `Cancelled("stream dropped by consumer")`; the caller's own reason only
//! reaches the consumer of this stream.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};

use crate::http::client::ByteStream;
use crate::http::error::{TransportError, TransportResult};
use crate::transport::cancel::CancelToken;

type CancelWait = Pin<Box<dyn Future<Output = Option<String>> + Send>>;

/// Ends with `TransportError::Cancelled` once its token is cancelled.
pub struct CancellableStream {
    upstream: ByteStream,
    token: CancelToken,
    cancelled: CancelWait,
    done: bool,
}

impl CancellableStream {
    /// Wrap `upstream` so it ends once `token` is cancelled.
    pub fn new(upstream: ByteStream, token: CancelToken) -> Self {
        let waiter = token.clone();
        Self {
            upstream,
            token,
            cancelled: Box::pin(async move { waiter.cancelled().await }),
            done: false,
        }
    }

    fn terminate(&mut self, reason: Option<String>) -> Poll<Option<TransportResult<Bytes>>> {
        self.done = true;
        // Release the connection now rather than when the consumer drops us.
        self.upstream = stream::empty().boxed();
        Poll::Ready(Some(Err(TransportError::cancelled(reason))))
    }
}

impl Stream for CancellableStream {
    type Item = TransportResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if this.token.is_cancelled() {
            return this.terminate(this.token.reason());
        }
        if let Poll::Ready(reason) = this.cancelled.as_mut().poll(cx) {
            return this.terminate(reason);
        }

        match this.upstream.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
