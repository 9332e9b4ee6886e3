//! Reassembly of inbound WebSocket frames into complete text messages.

use crate::error::DeepgramError;

/// One inbound frame, reduced to what reassembly needs.
#[derive(Debug)]
pub(crate) enum RawFrame {
    /// A text fragment; `fin` marks the final fragment of a message.
    Text { data: Vec<u8>, fin: bool },
    /// A binary frame. The server never sends these.
    Binary,
    /// A close frame.
    Close,
}

/// Outcome of feeding one frame to the reassembler.
#[derive(Debug, PartialEq)]
pub(crate) enum Reassembly {
    /// More fragments are needed.
    Incomplete,
    /// A complete text message.
    Message(String),
    /// The peer closed the connection. Any partial buffer is discarded.
    Closed,
}

/// Accumulates text fragments until the final fragment of a message
/// arrives, then yields the concatenation.
///
/// Exactly one instance exists per session, owned by the receive task.
/// UTF-8 is validated on the completed message, not per fragment, since
/// a fragment boundary may fall inside a multi-byte sequence.
#[derive(Debug, Default)]
pub(crate) struct FrameReassembler {
    buffer: Vec<u8>,
}

impl FrameReassembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one frame. Binary frames and invalid UTF-8 in a completed
    /// message are protocol violations.
    pub(crate) fn push(&mut self, frame: RawFrame) -> Result<Reassembly, DeepgramError> {
        match frame {
            RawFrame::Text { data, fin } => {
                self.buffer.extend_from_slice(&data);
                if fin {
                    let message = String::from_utf8(std::mem::take(&mut self.buffer))
                        .map_err(|e| {
                            DeepgramError::Protocol(format!("Message is not valid UTF-8: {e}"))
                        })?;
                    Ok(Reassembly::Message(message))
                } else {
                    Ok(Reassembly::Incomplete)
                }
            }
            RawFrame::Binary => Err(DeepgramError::Protocol(
                "Received unexpected binary frame".to_string(),
            )),
            RawFrame::Close => {
                self.buffer.clear();
                Ok(Reassembly::Closed)
            }
        }
    }
}
