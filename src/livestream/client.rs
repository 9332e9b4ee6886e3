//! Livestream session manager.
//!
//! One session owns one WebSocket connection. Outbound traffic (caller
//! audio and keepalives) is serialized through a single sink lock; one
//! receive task owns all inbound reads, frame reassembly and event
//! delivery. Events are delivered in wire-completion order.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::client::{DeepgramClient, USER_AGENT_VALUE};
use crate::error::DeepgramError;
use crate::livestream::config::LivestreamOptions;
use crate::livestream::frame::{FrameReassembler, RawFrame, Reassembly};
use crate::livestream::keepalive::{KEEPALIVE_INTERVAL, KeepaliveClock};
use crate::livestream::messages::{
    CLOSE_STREAM_PAYLOAD, Classification, KEEPALIVE_PAYLOAD, LivestreamEvent, StreamError,
    classify,
};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// ============================================================================
// Session state
// ============================================================================

/// Lifecycle state of a livestream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Open,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        }
    }
}

// ============================================================================
// Shared session internals
// ============================================================================

struct EventHandler {
    name: String,
    func: Box<dyn Fn(&LivestreamEvent) + Send + Sync>,
}

struct Shared {
    /// The one send lock. Both the caller path and the keepalive task
    /// write through it; it is held only for the duration of one write.
    sink: tokio::sync::Mutex<WsSink>,
    state: AtomicU8,
    clock: parking_lot::Mutex<KeepaliveClock>,
    pending: parking_lot::Mutex<VecDeque<LivestreamEvent>>,
    handlers: parking_lot::Mutex<Vec<Arc<EventHandler>>>,
    terminal_delivered: AtomicBool,
}

impl Shared {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Attempt a specific transition. States only ever advance, so a
    /// failed exchange means a later state already won the race.
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Force the absorbing terminal state without regressing.
    fn force_closed(&self) {
        self.state.fetch_max(SessionState::Closed as u8, Ordering::AcqRel);
    }

    /// Deliver one event: to registered handlers in registration order
    /// when any exist, otherwise into the pending queue for polling.
    fn deliver(&self, event: LivestreamEvent) {
        let snapshot: Vec<Arc<EventHandler>> = self.handlers.lock().clone();
        if snapshot.is_empty() {
            self.pending.lock().push_back(event);
            return;
        }
        for handler in snapshot {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| (handler.func)(&event)));
            if result.is_err() {
                error!(handler = %handler.name, "Event handler panicked");
            }
        }
    }

    /// Deliver the terminal `Closed` event at most once.
    fn deliver_terminal(&self) {
        if !self.terminal_delivered.swap(true, Ordering::AcqRel) {
            self.deliver(LivestreamEvent::Closed);
        }
    }
}

// ============================================================================
// Public session handle
// ============================================================================

/// A live transcription session.
///
/// Created by [`DeepgramClient::create_livestream`]. Audio goes out through
/// [`send_audio`](Self::send_audio); transcripts come back either through
/// registered handlers ([`on_event`](Self::on_event)) or by polling
/// [`receive_event`](Self::receive_event).
pub struct LivestreamApi {
    shared: Arc<Shared>,
    keepalive_task: tokio::task::JoinHandle<()>,
    receive_task: tokio::task::JoinHandle<()>,
}

impl LivestreamApi {
    pub(crate) async fn connect(
        client: &DeepgramClient,
        options: LivestreamOptions,
    ) -> Result<Self, DeepgramError> {
        Self::connect_with_period(client, options, KEEPALIVE_INTERVAL).await
    }

    /// Connect with an explicit keepalive period. Tests use short periods;
    /// production always goes through [`connect`](Self::connect).
    pub(crate) async fn connect_with_period(
        client: &DeepgramClient,
        options: LivestreamOptions,
        keepalive_period: Duration,
    ) -> Result<Self, DeepgramError> {
        let url = options.build_websocket_url(client.base_url())?;

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(DeepgramError::ConnectionFailed(
                    "Livestream URL has no host".to_string(),
                ));
            }
        };

        let request = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("Host", host)
            .header("Authorization", client.authorization_value())
            .header("User-Agent", USER_AGENT_VALUE)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", generate_key())
            .body(())
            .map_err(|e| DeepgramError::ConnectionFailed(e.to_string()))?;

        debug!(url = %url, "Opening livestream connection");
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| DeepgramError::ConnectionFailed(e.to_string()))?;
        let (sink, stream) = ws.split();

        let shared = Arc::new(Shared {
            sink: tokio::sync::Mutex::new(sink),
            state: AtomicU8::new(SessionState::Open as u8),
            clock: parking_lot::Mutex::new(KeepaliveClock::new(keepalive_period)),
            pending: parking_lot::Mutex::new(VecDeque::new()),
            handlers: parking_lot::Mutex::new(Vec::new()),
            terminal_delivered: AtomicBool::new(false),
        });
        info!("Livestream session open");

        let receive_task = tokio::spawn(receive_loop(shared.clone(), stream));
        let keepalive_task = tokio::spawn(keepalive_loop(shared.clone(), keepalive_period));

        Ok(Self {
            shared,
            keepalive_task,
            receive_task,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Send one chunk of audio as a binary WebSocket message.
    ///
    /// Requires the session to be open. The state is re-checked under the
    /// send lock, so a send racing `close()` fails rather than writing to
    /// a closed transport.
    pub async fn send_audio(&self, audio: Bytes) -> Result<(), DeepgramError> {
        self.require_open()?;
        let mut sink = self.shared.sink.lock().await;
        self.require_open()?;

        sink.send(Message::Binary(audio))
            .await
            .map_err(|e| DeepgramError::ConnectionFailed(e.to_string()))?;
        self.shared.clock.lock().record_send();
        Ok(())
    }

    /// Ask the server to finalize all pending transcripts and end the
    /// session.
    ///
    /// This is a request: the session transitions to `Closing`, and the
    /// terminal `Closed` event arrives once the server's close frame does.
    pub async fn request_closure(&self) -> Result<(), DeepgramError> {
        let state = self.shared.state();
        if state == SessionState::Closed {
            return Err(DeepgramError::InvalidState {
                expected: "connecting, open or closing",
                actual: state.as_str(),
            });
        }

        let mut sink = self.shared.sink.lock().await;
        if self.shared.state() == SessionState::Closed {
            return Err(DeepgramError::InvalidState {
                expected: "connecting, open or closing",
                actual: "closed",
            });
        }

        sink.send(Message::Text(CLOSE_STREAM_PAYLOAD.as_str().into()))
            .await
            .map_err(|e| DeepgramError::ConnectionFailed(e.to_string()))?;
        self.shared.clock.lock().record_send();
        if self.shared.transition(SessionState::Open, SessionState::Closing) {
            info!("Requested stream closure");
        }
        Ok(())
    }

    /// Take the next pending event, if any. Non-blocking.
    ///
    /// Only events produced while no handlers were registered end up in
    /// the pending queue.
    pub fn receive_event(&self) -> Option<LivestreamEvent> {
        self.shared.pending.lock().pop_front()
    }

    /// Register an event handler.
    ///
    /// Handlers run on the receive task, once per event, in registration
    /// order. A panicking handler is caught and logged against `name`;
    /// it neither stops later handlers nor kills the session.
    pub fn on_event<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&LivestreamEvent) + Send + Sync + 'static,
    {
        self.shared.handlers.lock().push(Arc::new(EventHandler {
            name: name.into(),
            func: Box::new(handler),
        }));
    }

    /// Close the session. Idempotent.
    ///
    /// Requests closure if the session is still open, closes the sink
    /// (which unblocks the pending inbound read), stops the keepalive
    /// task, and guarantees the terminal `Closed` event is delivered.
    pub async fn close(&self) {
        let was_open = self.shared.state() == SessionState::Open;

        let mut sink = self.shared.sink.lock().await;
        if was_open && self.shared.state() == SessionState::Open {
            if let Err(e) = sink.send(Message::Text(CLOSE_STREAM_PAYLOAD.as_str().into())).await {
                debug!(error = %e, "Close request failed, connection already down");
            }
        }
        self.shared.force_closed();
        if let Err(e) = sink.close().await {
            debug!(error = %e, "Sink close failed, connection already down");
        }
        drop(sink);

        self.keepalive_task.abort();
        self.shared.deliver_terminal();
    }

    fn require_open(&self) -> Result<(), DeepgramError> {
        let state = self.shared.state();
        if state != SessionState::Open {
            return Err(DeepgramError::InvalidState {
                expected: "open",
                actual: state.as_str(),
            });
        }
        Ok(())
    }
}

impl Drop for LivestreamApi {
    fn drop(&mut self) {
        self.keepalive_task.abort();
        if self.shared.state() != SessionState::Closed {
            warn!("Livestream session dropped without close()");
            self.shared.force_closed();
            // Close the transport so the receive task can exit.
            let shared = self.shared.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let mut sink = shared.sink.lock().await;
                    let _ = sink.close().await;
                });
            }
        } else {
            self.receive_task.abort();
        }
    }
}

// ============================================================================
// Background tasks
// ============================================================================

/// Sole owner of inbound reads, reassembly and event delivery.
async fn receive_loop(shared: Arc<Shared>, mut stream: WsStream) {
    let mut reassembler = FrameReassembler::new();

    loop {
        let message = match stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                // Reads racing our own close surface as transport errors;
                // those are not reportable failures.
                if shared.state() != SessionState::Closed {
                    error!(error = %e, "Livestream transport error");
                    shared.deliver(LivestreamEvent::Error(StreamError {
                        message: e.to_string(),
                        offset: None,
                        fragment: None,
                    }));
                }
                break;
            }
            None => break,
        };

        let frame = match message {
            Message::Text(text) => RawFrame::Text {
                data: text.as_str().as_bytes().to_vec(),
                fin: true,
            },
            Message::Binary(_) => RawFrame::Binary,
            Message::Close(_) => RawFrame::Close,
            // Pings are answered by tungstenite; raw frames never surface
            // on a normal read.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        let reassembly = match reassembler.push(frame) {
            Ok(reassembly) => reassembly,
            Err(e) => {
                error!(error = %e, "Protocol violation, terminating session");
                shared.deliver(LivestreamEvent::Error(StreamError {
                    message: e.to_string(),
                    offset: None,
                    fragment: None,
                }));
                break;
            }
        };

        match reassembly {
            Reassembly::Incomplete => continue,
            Reassembly::Closed => {
                debug!("Peer closed the livestream");
                shared.force_closed();
                // Flush the close acknowledgement so the peer's close
                // handshake completes.
                let mut sink = shared.sink.lock().await;
                let _ = sink.close().await;
                break;
            }
            Reassembly::Message(text) => match classify(&text) {
                Ok(Classification::Event(event)) => shared.deliver(event),
                Ok(Classification::Decode(DeepgramError::Decode {
                    offset,
                    fragment,
                    source,
                })) => {
                    warn!(offset, "Failed to decode livestream message");
                    shared.deliver(LivestreamEvent::Error(StreamError {
                        message: source.to_string(),
                        offset: Some(offset),
                        fragment: Some(fragment),
                    }));
                }
                Ok(Classification::Decode(other)) | Err(other) => {
                    // Undecodable structure: the stream can no longer be
                    // trusted.
                    error!(error = %other, "Protocol violation, terminating session");
                    shared.deliver(LivestreamEvent::Error(StreamError {
                        message: other.to_string(),
                        offset: None,
                        fragment: Some(text),
                    }));
                    break;
                }
                Ok(Classification::Ignored) => continue,
            },
        }
    }

    shared.force_closed();
    shared.deliver_terminal();
    debug!("Receive task exited");
}

/// Sends a keepalive whenever a full period passes without outbound
/// traffic. Exits once the session leaves the open state.
async fn keepalive_loop(shared: Arc<Shared>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // first tick completes immediately

    loop {
        interval.tick().await;
        if shared.state() != SessionState::Open {
            break;
        }
        if !shared.clock.lock().is_due() {
            continue;
        }

        let mut sink = shared.sink.lock().await;
        if shared.state() != SessionState::Open {
            break;
        }
        match sink.send(Message::Text(KEEPALIVE_PAYLOAD.as_str().into())).await {
            Ok(()) => {
                debug!("Sent keepalive");
                shared.clock.lock().record_send();
            }
            Err(e) => {
                debug!(error = %e, "Keepalive send failed");
                break;
            }
        }
    }
    debug!("Keepalive task exited");
}
