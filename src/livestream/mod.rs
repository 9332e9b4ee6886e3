//! Real-time transcription over a WebSocket connection.

mod client;
mod config;
mod frame;
mod keepalive;
mod messages;

#[cfg(test)]
mod tests;

pub use client::{LivestreamApi, SessionState};
pub use config::{AudioEncoding, LivestreamOptions};
pub use messages::{LivestreamEvent, StreamError};
