//! ObservableClient event emission.

mod common;

use std::sync::Arc;
use std::time::Duration;

use backend_transport::http::{Headers, HttpClient, Method, SequentialRequestIds};
use backend_transport::observability::{HttpEvent, ObservableClient, RecordingObserver};
use backend_transport::{Response, TransportError};
use bytes::Bytes;
use common::{channel_stream, chunk_stream, url, MockClient, PanickingObserver};
use futures_util::StreamExt;
use serde_json::json;

fn observed(raw: &Arc<MockClient>) -> (ObservableClient, Arc<RecordingObserver>) {
    let recorder = Arc::new(RecordingObserver::new());
    let inner: Arc<dyn HttpClient> = raw.clone();
    let client = ObservableClient::new(inner)
        .with_observer(recorder.clone())
        .with_request_ids(Arc::new(SequentialRequestIds::new("req")));
    (client, recorder)
}

fn auth_headers() -> Headers {
    Headers::from([
        ("Authorization".to_string(), "Bearer secret".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ])
}

#[tokio::test]
async fn test_request_then_response_share_request_id() {
    let raw = Arc::new(MockClient::responding(|_, _| {
        Ok(Response::new(200, r#"{"id":"1","refresh_token":"rt"}"#)
            .with_headers([("Content-Type", "application/json"), ("Set-Cookie", "sid=1")]))
    }));
    let (client, recorder) = observed(&raw);

    let response = client
        .request(
            Method::POST,
            url("https://api.test/api/rooms?access_token=abc&page=1"),
            auth_headers(),
            Some(Bytes::from(r#"{"name":"General","password":"p"}"#)),
            None,
        )
        .await
        .unwrap();

    // Nothing is redacted on the wire or in what the caller gets back.
    assert_eq!(response.body(), r#"{"id":"1","refresh_token":"rt"}"#);
    let calls = raw.calls();
    assert_eq!(calls[0].header("authorization"), Some("Bearer secret"));
    assert!(calls[0].uri.as_str().contains("access_token=abc"));

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    match (&events[0], &events[1]) {
        (HttpEvent::Request(request), HttpEvent::Response(resp)) => {
            assert_eq!(request.request_id, "req-1");
            assert_eq!(resp.request_id, "req-1");
            assert_eq!(request.method, Method::POST);
            assert_eq!(request.headers["Authorization"], "[REDACTED]");
            assert_eq!(request.headers["Accept"], "application/json");
            assert!(!request.uri.as_str().contains("abc"));
            assert_eq!(
                request.body,
                Some(json!({"name": "General", "password": "[REDACTED]"}))
            );

            assert_eq!(resp.status_code, 200);
            assert_eq!(resp.body_size, response.body_bytes().len());
            assert_eq!(
                resp.body,
                Some(json!({"id": "1", "refresh_token": "[REDACTED]"}))
            );
            assert_eq!(resp.headers.as_ref().unwrap()["set-cookie"], "[REDACTED]");
            assert_eq!(
                resp.headers.as_ref().unwrap()["content-type"],
                "application/json"
            );
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_status_is_a_response_event() {
    let raw = Arc::new(MockClient::with_status(401, r#"{"detail":"expired"}"#));
    let (client, recorder) = observed(&raw);

    let response = client
        .request(Method::GET, url("https://api.test/api/me"), Headers::new(), None, None)
        .await
        .unwrap();
    assert_eq!(response.status_code(), 401);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], HttpEvent::Response(r) if r.status_code == 401));
}

#[tokio::test]
async fn test_failure_emits_error_event_and_propagates() {
    let failure = TransportError::network("connection refused");
    let raw = Arc::new(MockClient::failing(failure.clone()));
    let (client, recorder) = observed(&raw);

    let err = client
        .request(Method::GET, url("https://api.test/api/rooms"), Headers::new(), None, None)
        .await
        .unwrap_err();
    assert_eq!(err, failure);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], HttpEvent::Request(_)));
    match &events[1] {
        HttpEvent::Error(error) => {
            assert_eq!(error.request_id, "req-1");
            assert_eq!(error.method, Method::GET);
            assert_eq!(error.exception, failure);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_each_call_gets_its_own_request_id() {
    let raw = Arc::new(MockClient::with_status(200, "{}"));
    let (client, recorder) = observed(&raw);

    for _ in 0..2 {
        client
            .request(Method::GET, url("https://api.test/api/rooms"), Headers::new(), None, None)
            .await
            .unwrap();
    }

    assert_eq!(recorder.events_for("req-1").len(), 2);
    assert_eq!(recorder.events_for("req-2").len(), 2);
    assert_eq!(recorder.events().len(), 4);
}

#[tokio::test]
async fn test_dropped_call_still_gets_terminal_event() {
    let raw = Arc::new(MockClient::with_status(200, "{}").with_delay(Duration::from_secs(5)));
    let (client, recorder) = observed(&raw);

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        client.request(Method::GET, url("https://api.test/api/slow"), Headers::new(), None, None),
    )
    .await;
    assert!(outcome.is_err());

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    match &events[1] {
        HttpEvent::Error(error) => assert_eq!(
            error.exception,
            TransportError::cancelled(Some("request dropped before completion".into()))
        ),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_panicking_observer_does_not_break_the_call() {
    let raw = Arc::new(
        MockClient::with_status(200, r#"{"ok":true}"#).with_stream(|_| Ok(chunk_stream(&["x"]))),
    );
    let recorder = Arc::new(RecordingObserver::new());
    let inner: Arc<dyn HttpClient> = raw.clone();
    let client = ObservableClient::new(inner)
        .with_observer(Arc::new(PanickingObserver))
        .with_observer(recorder.clone());
    assert_eq!(client.observer_count(), 2);

    let response = client
        .request(Method::GET, url("https://api.test/api/rooms"), Headers::new(), None, None)
        .await
        .unwrap();
    assert_eq!(response.status_code(), 200);

    let chunks: Vec<_> = client
        .request_stream(Method::GET, url("https://api.test/api/feed"), Headers::new(), None)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks, vec![Ok(Bytes::from("x"))]);

    assert_eq!(recorder.events().len(), 4);
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let raw = Arc::new(MockClient::with_status(200, "").with_stream(|_| Ok(chunk_stream(&["a"]))));
    let (client, recorder) = observed(&raw);

    let stream = client
        .request_stream(Method::GET, url("https://api.test/api/feed"), Headers::new(), None)
        .await
        .unwrap();
    assert_eq!(raw.call_count(), 0);
    assert!(recorder.events().is_empty());

    drop(stream);
    assert_eq!(raw.call_count(), 0);
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_stream_start_and_single_end() {
    let raw = Arc::new(MockClient::with_status(200, "").with_stream(|_| {
        Ok(chunk_stream(&[
            "data: {\"text\":\"hi\",",
            "\"session_token\":\"s\"}\n\n",
        ]))
    }));
    let (client, recorder) = observed(&raw);

    let mut stream = client
        .request_stream(
            Method::POST,
            url("https://api.test/api/rooms/1/messages"),
            auth_headers(),
            Some(Bytes::from(r#"{"prompt":"hello"}"#)),
        )
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(
        String::from_utf8(received).unwrap(),
        "data: {\"text\":\"hi\",\"session_token\":\"s\"}\n\n"
    );
    assert!(stream.next().await.is_none());
    drop(stream);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    match (&events[0], &events[1]) {
        (HttpEvent::StreamStart(start), HttpEvent::StreamEnd(end)) => {
            assert_eq!(start.request_id, end.request_id);
            assert_eq!(start.method, Method::POST);
            assert_eq!(start.headers["Authorization"], "[REDACTED]");
            assert_eq!(start.body, Some(json!({"prompt": "hello"})));

            assert!(end.is_success());
            assert_eq!(end.bytes_received, 41);
            let body = end.body.as_deref().unwrap();
            assert!(body.contains("[REDACTED]"));
            assert!(body.contains("hi"));
            assert!(!body.contains("\"s\""));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_error_ends_stream() {
    let (tx, upstream) = channel_stream();
    let upstream = std::sync::Mutex::new(Some(upstream));
    let raw = Arc::new(
        MockClient::with_status(200, "")
            .with_stream(move |_| Ok(upstream.lock().unwrap().take().unwrap())),
    );
    let (client, recorder) = observed(&raw);

    tx.send(Ok(Bytes::from("abc"))).unwrap();
    tx.send(Err(TransportError::network("connection reset"))).unwrap();

    let mut stream = client
        .request_stream(Method::GET, url("https://api.test/api/feed"), Headers::new(), None)
        .await
        .unwrap();

    assert_eq!(stream.next().await, Some(Ok(Bytes::from("abc"))));
    assert_eq!(
        stream.next().await,
        Some(Err(TransportError::network("connection reset")))
    );
    // Later items are never delivered once the stream has failed.
    tx.send(Ok(Bytes::from("late"))).unwrap();
    assert_eq!(stream.next().await, None);
    drop(stream);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    match &events[1] {
        HttpEvent::StreamEnd(end) => {
            assert_eq!(end.error, Some(TransportError::network("connection reset")));
            assert_eq!(end.bytes_received, 3);
            assert_eq!(end.body.as_deref(), Some("abc"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_open_failure() {
    let raw = Arc::new(MockClient::with_status(200, "").with_stream(|call| {
        Err(TransportError::from_status(
            401,
            r#"{"detail":"expired"}"#,
            call.uri.path(),
        ))
    }));
    let (client, recorder) = observed(&raw);

    let mut stream = client
        .request_stream(Method::GET, url("https://api.test/api/feed"), Headers::new(), None)
        .await
        .unwrap();
    let first = stream.next().await.unwrap();
    assert!(first.unwrap_err().is_auth());
    assert!(stream.next().await.is_none());

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], HttpEvent::StreamStart(_)));
    assert!(matches!(
        &events[1],
        HttpEvent::StreamEnd(end) if end.error.as_ref().is_some_and(|e| e.is_auth())
    ));
}

#[tokio::test]
async fn test_stream_capture_is_bounded() {
    let raw = Arc::new(
        MockClient::with_status(200, "")
            .with_stream(|_| Ok(chunk_stream(&["abcdefgh", "ijklmnop"]))),
    );
    let (client, recorder) = observed(&raw);
    let client = client.with_capture_limit(10);

    let chunks: Vec<_> = client
        .request_stream(Method::GET, url("https://api.test/api/feed"), Headers::new(), None)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 2);

    match recorder.events().last() {
        Some(HttpEvent::StreamEnd(end)) => {
            assert_eq!(end.bytes_received, 16);
            assert_eq!(end.body.as_deref(), Some("abcdefghij"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_dropped_stream_reports_cancellation() {
    let (tx, upstream) = channel_stream();
    let upstream = std::sync::Mutex::new(Some(upstream));
    let raw = Arc::new(
        MockClient::with_status(200, "")
            .with_stream(move |_| Ok(upstream.lock().unwrap().take().unwrap())),
    );
    let (client, recorder) = observed(&raw);

    let mut stream = client
        .request_stream(Method::GET, url("https://api.test/api/feed"), Headers::new(), None)
        .await
        .unwrap();
    tx.send(Ok(Bytes::from("first"))).unwrap();
    assert_eq!(stream.next().await, Some(Ok(Bytes::from("first"))));
    drop(stream);

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    match &events[1] {
        HttpEvent::StreamEnd(end) => {
            assert_eq!(
                end.error,
                Some(TransportError::cancelled(Some("stream dropped by consumer".into())))
            );
            assert_eq!(end.bytes_received, 5);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_close_reaches_inner_client() {
    let raw = Arc::new(MockClient::with_status(200, ""));
    let (client, _) = observed(&raw);
    client.close();
    assert_eq!(raw.close_count(), 1);
}
