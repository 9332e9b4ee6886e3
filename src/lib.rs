//! Client for the Deepgram speech-to-text API.
//!
//! Two transcription surfaces share one [`DeepgramClient`]:
//!
//! - [`livestream`]: real-time transcription over a WebSocket connection,
//!   with concurrent audio writes, typed inbound events and automatic
//!   keepalives during silence.
//! - [`prerecorded`]: one-shot batch transcription over HTTP, from raw
//!   bytes or a hosted URL.
//!
//! ```no_run
//! use bytes::Bytes;
//! use deepgram_client::{DeepgramClient, LivestreamEvent, LivestreamOptions};
//!
//! # async fn run() -> Result<(), deepgram_client::DeepgramError> {
//! let client = DeepgramClient::new("YOUR_API_KEY")?;
//! let session = client.create_livestream(LivestreamOptions::new()).await?;
//!
//! session.send_audio(Bytes::from_static(&[0u8; 3200])).await?;
//! session.request_closure().await?;
//!
//! while let Some(event) = session.receive_event() {
//!     if let LivestreamEvent::Transcript(result) = event {
//!         println!("{}", result.channel.alternatives[0].transcript);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod options;
mod routes;
mod tier;

pub mod entities;
pub mod livestream;
pub mod prerecorded;

pub use client::DeepgramClient;
pub use error::DeepgramError;
pub use livestream::{
    AudioEncoding, LivestreamApi, LivestreamEvent, LivestreamOptions, SessionState, StreamError,
};
pub use options::TranscriptionOptions;
pub use prerecorded::{PrerecordedApi, PrerecordedOptions};
pub use tier::Tier;
