//! Session tests against an in-process WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::client::DeepgramClient;
use crate::error::DeepgramError;
use crate::livestream::client::{LivestreamApi, SessionState};
use crate::livestream::config::LivestreamOptions;
use crate::livestream::messages::LivestreamEvent;

const RESULTS_JSON: &str = r#"{
    "type": "Results",
    "channel_index": [0],
    "duration": 1.0,
    "start": 0.0,
    "is_final": true,
    "speech_final": true,
    "channel": {
        "alternatives": [{
            "transcript": "hello world",
            "confidence": 0.97,
            "words": [
                {"word": "hello", "confidence": 0.98, "start": 0.1, "end": 0.5},
                {"word": "world", "confidence": 0.96, "start": 0.6, "end": 1.1}
            ]
        }]
    }
}"#;

const METADATA_JSON: &str =
    r#"{"type":"Metadata","request_id":"bb9ba916-6992-4c5a-a820-5e57eeb50e09"}"#;

/// What one mock server connection observed.
#[derive(Debug, Default)]
struct ServerLog {
    audio_messages: usize,
    keepalives: usize,
    close_requests: usize,
}

/// Bind a listener and serve exactly one WebSocket connection with the
/// given handler.
async fn spawn_server<F, Fut>(
    handler: F,
) -> (Url, tokio::task::JoinHandle<ServerLog>)
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ServerLog> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        handler(ws).await
    });
    (Url::parse(&format!("http://{addr}")).unwrap(), handle)
}

/// Standard server behavior: log inbound traffic, reply to a
/// `CloseStream` request with `extra` messages followed by a close frame.
async fn echo_server(
    mut ws: WebSocketStream<TcpStream>,
    extra: Vec<String>,
) -> ServerLog {
    let mut log = ServerLog::default();
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Binary(_) => log.audio_messages += 1,
            Message::Text(text) if text.as_str() == r#"{"type":"KeepAlive"}"# => {
                log.keepalives += 1;
            }
            Message::Text(text) if text.as_str() == r#"{"type":"CloseStream"}"# => {
                log.close_requests += 1;
                for payload in &extra {
                    ws.send(Message::Text(payload.as_str().into())).await.unwrap();
                }
                ws.close(None).await.unwrap();
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    log
}

fn test_client(base: Url) -> DeepgramClient {
    DeepgramClient::with_base_url("test-key", base).unwrap()
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

async fn connect(base: Url, period: Duration) -> LivestreamApi {
    init_tracing();
    LivestreamApi::connect_with_period(&test_client(base), LivestreamOptions::new(), period)
        .await
        .unwrap()
}

/// Wait for the session to reach the closed state.
async fn wait_closed(session: &LivestreamApi) {
    timeout(Duration::from_secs(5), async {
        while session.state() != SessionState::Closed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session did not close in time");
}

#[tokio::test]
async fn test_end_to_end_session() {
    let (base, server) = spawn_server(|ws| {
        echo_server(ws, vec![RESULTS_JSON.to_string(), METADATA_JSON.to_string()])
    })
    .await;

    let session = connect(base, Duration::from_secs(5)).await;
    assert_eq!(session.state(), SessionState::Open);

    for _ in 0..3 {
        session.send_audio(Bytes::from(vec![0u8; 8192])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    session.request_closure().await.unwrap();
    wait_closed(&session).await;

    let log = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(log.audio_messages, 3);
    assert_eq!(log.close_requests, 1);
    assert_eq!(log.keepalives, 0, "gaps within the period must not trigger keepalives");

    // Events arrive in wire order with the terminal event last.
    match session.receive_event() {
        Some(LivestreamEvent::Transcript(result)) => {
            assert!(result.is_final);
            assert_eq!(result.channel.alternatives[0].transcript, "hello world");
            assert_eq!(result.channel.alternatives[0].words.len(), 2);
        }
        other => panic!("Expected transcript first, got {other:?}"),
    }
    assert!(matches!(
        session.receive_event(),
        Some(LivestreamEvent::Metadata(_))
    ));
    assert!(matches!(session.receive_event(), Some(LivestreamEvent::Closed)));
    assert!(session.receive_event().is_none());
}

#[tokio::test]
async fn test_closure_transitions_through_closing() {
    let (base, server) = spawn_server(|mut ws| async move {
        let log = ServerLog::default();
        // Hold the connection open until the close request arrives.
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = &message {
                if text.as_str() == r#"{"type":"CloseStream"}"# {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    ws.close(None).await.unwrap();
                }
            }
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
        log
    })
    .await;

    let session = connect(base, Duration::from_secs(5)).await;
    session.request_closure().await.unwrap();
    assert_eq!(session.state(), SessionState::Closing);

    wait_closed(&session).await;
    assert!(matches!(session.receive_event(), Some(LivestreamEvent::Closed)));
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_send_audio_after_close_is_invalid_state() {
    let (base, server) = spawn_server(|ws| echo_server(ws, Vec::new())).await;

    let session = connect(base, Duration::from_secs(5)).await;
    session.close().await;

    let error = session.send_audio(Bytes::from_static(&[0u8; 16])).await.unwrap_err();
    match error {
        DeepgramError::InvalidState { expected, actual } => {
            assert_eq!(expected, "open");
            assert_eq!(actual, "closed");
        }
        other => panic!("Expected InvalidState, got {other:?}"),
    }

    // close() is idempotent and the terminal event is delivered once.
    session.close().await;
    assert!(matches!(session.receive_event(), Some(LivestreamEvent::Closed)));
    assert!(session.receive_event().is_none());
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_keepalives_sent_during_silence() {
    let (base, server) = spawn_server(|ws| echo_server(ws, Vec::new())).await;

    // Short period so the test stays fast; bounds are generous to absorb
    // scheduler jitter.
    let session = connect(base, Duration::from_millis(100)).await;
    tokio::time::sleep(Duration::from_millis(450)).await;
    session.request_closure().await.unwrap();
    wait_closed(&session).await;

    let log = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(
        (2..=5).contains(&log.keepalives),
        "expected a keepalive per silent period, got {}",
        log.keepalives
    );
}

#[tokio::test]
async fn test_steady_audio_suppresses_keepalives() {
    let (base, server) = spawn_server(|ws| echo_server(ws, Vec::new())).await;

    let session = connect(base, Duration::from_millis(100)).await;
    for _ in 0..10 {
        session.send_audio(Bytes::from_static(&[0u8; 64])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    session.request_closure().await.unwrap();
    wait_closed(&session).await;

    let log = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(log.audio_messages, 10);
    assert_eq!(log.keepalives, 0);
}

#[tokio::test]
async fn test_decode_error_is_recoverable() {
    // Results missing its required duration field, then a valid message.
    let malformed = r#"{"type":"Results","start":0.0,"is_final":true,"channel":{"alternatives":[]}}"#;
    let (base, server) = spawn_server(move |ws| {
        echo_server(ws, vec![malformed.to_string(), RESULTS_JSON.to_string()])
    })
    .await;

    let session = connect(base, Duration::from_secs(5)).await;
    session.request_closure().await.unwrap();
    wait_closed(&session).await;
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();

    match session.receive_event() {
        Some(LivestreamEvent::Error(stream_error)) => {
            assert!(stream_error.offset.is_some());
            assert_eq!(stream_error.fragment.as_deref(), Some(malformed));
        }
        other => panic!("Expected error event, got {other:?}"),
    }
    // The session survived the malformed message.
    assert!(matches!(
        session.receive_event(),
        Some(LivestreamEvent::Transcript(_))
    ));
    assert!(matches!(session.receive_event(), Some(LivestreamEvent::Closed)));
}

#[tokio::test]
async fn test_unknown_message_type_is_dropped() {
    let unknown = r#"{"type":"SpeechStarted","timestamp":1.5}"#;
    let (base, server) = spawn_server(move |ws| {
        echo_server(ws, vec![unknown.to_string(), METADATA_JSON.to_string()])
    })
    .await;

    let session = connect(base, Duration::from_secs(5)).await;
    session.request_closure().await.unwrap();
    wait_closed(&session).await;
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();

    assert!(matches!(
        session.receive_event(),
        Some(LivestreamEvent::Metadata(_))
    ));
    assert!(matches!(session.receive_event(), Some(LivestreamEvent::Closed)));
    assert!(session.receive_event().is_none());
}

#[tokio::test]
async fn test_handler_panic_does_not_stop_delivery() {
    let (base, server) = spawn_server(|ws| {
        echo_server(ws, vec![METADATA_JSON.to_string(), RESULTS_JSON.to_string()])
    })
    .await;

    let session = connect(base, Duration::from_secs(5)).await;

    let delivered = Arc::new(AtomicUsize::new(0));
    session.on_event("panicking", |_| panic!("handler failure"));
    let counter = delivered.clone();
    session.on_event("counting", move |event| {
        if !matches!(event, LivestreamEvent::Closed) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    session.request_closure().await.unwrap();
    wait_closed(&session).await;
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();

    // Both events reached the second handler despite the first panicking.
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    // With handlers registered nothing lands in the pending queue.
    assert!(session.receive_event().is_none());
}

#[tokio::test]
async fn test_protocol_violation_terminates_session() {
    let (base, server) = spawn_server(|mut ws| async move {
        let log = ServerLog::default();
        // A payload with no locatable discriminator.
        ws.send(Message::Text("not json".into())).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
        log
    })
    .await;

    let session = connect(base, Duration::from_secs(5)).await;
    wait_closed(&session).await;

    match session.receive_event() {
        Some(LivestreamEvent::Error(stream_error)) => {
            assert!(stream_error.message.contains("type"));
        }
        other => panic!("Expected error event, got {other:?}"),
    }
    assert!(matches!(session.receive_event(), Some(LivestreamEvent::Closed)));

    session.close().await;
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}
