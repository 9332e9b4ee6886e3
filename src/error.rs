//! Error types for the Deepgram client.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while talking to the Deepgram API.
#[derive(Debug, Error)]
pub enum DeepgramError {
    /// WebSocket handshake or transport establishment failed.
    ///
    /// Fatal for the session. No retry is attempted internally; reconnection
    /// policy belongs to the caller.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed (e.g. a missing API key).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// An operation was attempted in a lifecycle state that forbids it.
    ///
    /// The session itself is unaffected.
    #[error("Invalid session state: operation requires {expected}, session is {actual}")]
    InvalidState {
        /// The state(s) the operation requires.
        expected: &'static str,
        /// The state the session was actually in.
        actual: &'static str,
    },

    /// The peer violated the wire protocol: a binary inbound frame, a
    /// message that is not valid UTF-8, or a message whose discriminator
    /// could not be located. Terminates the receive task.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A message with a recognized discriminator failed to decode into its
    /// typed payload. Recoverable; surfaced as an error event while the
    /// session continues.
    #[error("Failed to decode message at byte {offset}: {source}")]
    Decode {
        /// Byte offset of the failure within the payload.
        offset: usize,
        /// The payload that failed to decode.
        fragment: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Structured error body returned by the Deepgram HTTP API.
    #[error("Http error {status}, {err_code}: {err_msg}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Error code provided by the API (e.g. `INVALID_AUTH`).
        err_code: String,
        /// Human-readable error description.
        err_msg: String,
        /// Request ID provided by the API, when present.
        request_id: Option<Uuid>,
    },

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Error body shape returned by the HTTP API on non-success responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    err_code: Option<String>,
    #[serde(default)]
    err_msg: Option<String>,
    #[serde(default)]
    request_id: Option<Uuid>,
}

impl DeepgramError {
    /// Build an [`DeepgramError::Api`] from a non-success response body.
    ///
    /// The body is best-effort: an empty or unparseable body still yields a
    /// usable error carrying the status code.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or(ApiErrorBody {
            err_code: None,
            err_msg: None,
            request_id: None,
        });

        DeepgramError::Api {
            status,
            err_code: parsed.err_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            err_msg: parsed
                .err_msg
                .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
            request_id: parsed.request_id,
        }
    }
}
