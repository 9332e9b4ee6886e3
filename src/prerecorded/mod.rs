//! Batch transcription of prerecorded audio.

mod client;
mod config;

pub use client::PrerecordedApi;
pub use config::PrerecordedOptions;
