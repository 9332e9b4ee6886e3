//! Message types and classification for the livestream protocol.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::{LivestreamResult, Metadata};
use crate::error::DeepgramError;

// ============================================================================
// Outbound control messages
// ============================================================================

/// A control message sent over the livestream connection.
#[derive(Debug, Serialize)]
struct ControlMessage {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Precomputed `{"type":"KeepAlive"}` payload.
pub(crate) static KEEPALIVE_PAYLOAD: Lazy<String> = Lazy::new(|| {
    serde_json::to_string(&ControlMessage { kind: "KeepAlive" })
        .unwrap_or_else(|_| r#"{"type":"KeepAlive"}"#.to_string())
});

/// Precomputed `{"type":"CloseStream"}` payload.
pub(crate) static CLOSE_STREAM_PAYLOAD: Lazy<String> = Lazy::new(|| {
    serde_json::to_string(&ControlMessage { kind: "CloseStream" })
        .unwrap_or_else(|_| r#"{"type":"CloseStream"}"#.to_string())
});

// ============================================================================
// Inbound events
// ============================================================================

/// An event produced by the livestream session.
#[derive(Debug, Clone)]
pub enum LivestreamEvent {
    /// Request metadata, sent once per session.
    Metadata(Metadata),
    /// A transcription result, interim or final.
    Transcript(LivestreamResult),
    /// A recoverable or terminal session error.
    Error(StreamError),
    /// The session ended. Delivered exactly once, last.
    Closed,
}

/// Details of an error surfaced as a [`LivestreamEvent::Error`].
#[derive(Debug, Clone)]
pub struct StreamError {
    /// Human-readable description.
    pub message: String,
    /// Byte offset within the offending payload, when known.
    pub offset: Option<usize>,
    /// The payload that failed to decode, when the error is a decode error.
    pub fragment: Option<String>,
}

// ============================================================================
// Classification
// ============================================================================

/// Minimal probe for the `type` discriminator. Every other field is
/// ignored, so a full parse is deferred until the type is known.
#[derive(Debug, Deserialize)]
struct TypePeek {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Outcome of classifying one complete inbound message.
#[derive(Debug)]
pub(crate) enum Classification {
    /// A typed event to deliver.
    Event(LivestreamEvent),
    /// Recognized type, malformed body. Recoverable.
    Decode(DeepgramError),
    /// Unrecognized type, dropped for forward compatibility.
    Ignored,
}

/// Classify one complete text message.
///
/// Returns `Err` only for payloads whose discriminator cannot be located,
/// which is fatal to the session.
pub(crate) fn classify(text: &str) -> Result<Classification, DeepgramError> {
    let peek: TypePeek = serde_json::from_str(text).map_err(|e| {
        DeepgramError::Protocol(format!("Failed to locate message type: {e}"))
    })?;
    let Some(kind) = peek.kind else {
        return Err(DeepgramError::Protocol(
            "Message is missing the type field".to_string(),
        ));
    };

    match kind.as_str() {
        "Results" => Ok(decode::<LivestreamResult>(text, LivestreamEvent::Transcript)),
        "Metadata" => Ok(decode::<Metadata>(text, LivestreamEvent::Metadata)),
        other => {
            debug!(message_type = other, "Ignoring unrecognized message type");
            Ok(Classification::Ignored)
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(
    text: &str,
    wrap: fn(T) -> LivestreamEvent,
) -> Classification {
    match serde_json::from_str::<T>(text) {
        Ok(payload) => Classification::Event(wrap(payload)),
        Err(source) => {
            let offset = byte_offset(text, source.line(), source.column());
            Classification::Decode(DeepgramError::Decode {
                offset,
                fragment: text.to_string(),
                source,
            })
        }
    }
}

/// Convert serde_json's 1-based line/column position into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let mut remaining = line.saturating_sub(1);
    let mut offset = 0;
    for (i, b) in text.bytes().enumerate() {
        if remaining == 0 {
            break;
        }
        if b == b'\n' {
            remaining -= 1;
            offset = i + 1;
        }
    }
    (offset + column.saturating_sub(1)).min(text.len())
}
