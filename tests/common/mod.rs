//! Shared mocks for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use backend_transport::http::{find_header, ByteStream, Headers, HttpClient, Method};
use backend_transport::observability::{
    ErrorEvent, HttpObserver, RequestEvent, ResponseEvent, StreamEndEvent, StreamStartEvent,
};
use backend_transport::{
    Response, StaticToken, TokenProvider, TokenRefresher, TransportError, TransportResult,
};
use bytes::Bytes;
use futures_util::stream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

/// One call seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub uri: Url,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

type Responder = Box<dyn Fn(&RecordedCall, usize) -> TransportResult<Response> + Send + Sync>;
type Streamer = Box<dyn Fn(&RecordedCall) -> TransportResult<ByteStream> + Send + Sync>;

/// Scripted raw client.
pub struct MockClient {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Responder,
    streamer: Streamer,
    delay: Option<Duration>,
    closes: AtomicUsize,
}

impl MockClient {
    /// Respond with `f(call, index)`, index counting from 0.
    pub fn responding<F>(f: F) -> Self
    where
        F: Fn(&RecordedCall, usize) -> TransportResult<Response> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(f),
            streamer: Box::new(|_| Ok(Box::pin(stream::empty()))),
            delay: None,
            closes: AtomicUsize::new(0),
        }
    }

    pub fn with_status(status: u16, body: &'static str) -> Self {
        Self::responding(move |_, _| Ok(Response::new(status, body)))
    }

    pub fn failing(err: TransportError) -> Self {
        Self::responding(move |_, _| Err(err.clone()))
    }

    /// Sleep before answering. A timeout shorter than the delay fails the
    /// call the way a real socket read would.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_stream<F>(mut self, f: F) -> Self
    where
        F: Fn(&RecordedCall) -> TransportResult<ByteStream> + Send + Sync + 'static,
    {
        self.streamer = Box::new(f);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, call: RecordedCall) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len() - 1
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn request(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> TransportResult<Response> {
        let call = RecordedCall {
            method,
            uri,
            headers,
            body,
            timeout,
        };
        let index = self.record(call.clone());

        if let Some(delay) = self.delay {
            if let Some(timeout) = timeout {
                if timeout < delay {
                    tokio::time::sleep(timeout).await;
                    return Err(TransportError::timeout(format!(
                        "Request timed out after {:?}",
                        timeout
                    )));
                }
            }
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&call, index)
    }

    async fn request_stream(
        &self,
        method: Method,
        uri: Url,
        headers: Headers,
        body: Option<Bytes>,
    ) -> TransportResult<ByteStream> {
        let call = RecordedCall {
            method,
            uri,
            headers,
            body,
            timeout: None,
        };
        self.record(call.clone());
        (self.streamer)(&call)
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A stream fed by the returned sender.
pub fn channel_stream() -> (mpsc::UnboundedSender<TransportResult<Bytes>>, ByteStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
    (tx, Box::pin(stream))
}

/// A finite stream of text chunks.
pub fn chunk_stream(chunks: &[&'static str]) -> ByteStream {
    let items: Vec<TransportResult<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from(*c))).collect();
    Box::pin(stream::iter(items))
}

/// Refresher that counts calls and sleeps before answering.
pub struct CountingRefresher {
    pub tokens: Arc<StaticToken>,
    try_calls: AtomicUsize,
    proactive_calls: AtomicUsize,
    delay: Duration,
    outcome: Mutex<TransportResult<bool>>,
    needs_refresh: AtomicBool,
}

impl CountingRefresher {
    /// Successful refresher that rotates the token to `fresh`.
    pub fn new(tokens: Arc<StaticToken>, delay: Duration) -> Self {
        Self {
            tokens,
            try_calls: AtomicUsize::new(0),
            proactive_calls: AtomicUsize::new(0),
            delay,
            outcome: Mutex::new(Ok(true)),
            needs_refresh: AtomicBool::new(false),
        }
    }

    pub fn with_outcome(self, outcome: TransportResult<bool>) -> Self {
        *self.outcome.lock().unwrap() = outcome;
        self
    }

    pub fn try_calls(&self) -> usize {
        self.try_calls.load(Ordering::SeqCst)
    }

    pub fn proactive_calls(&self) -> usize {
        self.proactive_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    fn needs_refresh(&self) -> bool {
        self.needs_refresh.load(Ordering::SeqCst)
    }

    async fn refresh_if_expiring_soon(&self) {
        self.proactive_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn try_refresh(&self) -> TransportResult<bool> {
        let n = self.try_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        let outcome = self.outcome.lock().unwrap().clone();
        if outcome == Ok(true) {
            self.tokens.set(Some(format!("fresh-{}", n)));
        }
        outcome
    }
}

/// Responds 401 unless the request carries a refreshed token.
pub fn requires_fresh_token(call: &RecordedCall, _: usize) -> TransportResult<Response> {
    match call.header("authorization") {
        Some(value) if value.starts_with("Bearer fresh") => {
            Ok(Response::new(200, r#"{"ok":true}"#))
        }
        _ => Ok(Response::new(401, r#"{"detail":"Token expired"}"#)),
    }
}

pub fn stale_token() -> Arc<StaticToken> {
    Arc::new(StaticToken::new(Some("stale".into())))
}

/// Current token of a provider, for assertions.
pub fn current_token(tokens: &StaticToken) -> Option<String> {
    tokens.access_token()
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Observer that panics on every event.
pub struct PanickingObserver;

impl HttpObserver for PanickingObserver {
    fn on_request(&self, _event: &RequestEvent) {
        panic!("observer failure on request");
    }

    fn on_response(&self, _event: &ResponseEvent) {
        panic!("observer failure on response");
    }

    fn on_error(&self, _event: &ErrorEvent) {
        panic!("observer failure on error");
    }

    fn on_stream_start(&self, _event: &StreamStartEvent) {
        panic!("observer failure on stream start");
    }

    fn on_stream_end(&self, _event: &StreamEndEvent) {
        panic!("observer failure on stream end");
    }
}

/// Start a mock backend on an ephemeral port that answers every
/// connection with `status` and a JSON `body` after `delay`.
pub async fn start_mock_backend(status: u16, body: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut request = [0u8; 4096];
                        let _ = socket.read(&mut request).await;
                        tokio::time::sleep(delay).await;

                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason_phrase(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
