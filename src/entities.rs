//! Response records returned by the transcription endpoints.

use serde::Deserialize;
use uuid::Uuid;

/// Request metadata attached to every transcription.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub request_id: Uuid,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub models: Vec<Uuid>,
    #[serde(default)]
    pub model_info: std::collections::HashMap<Uuid, ModelInfo>,
}

/// Description of a model that produced results.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub arch: String,
}

/// One transcription result emitted over the livestream connection.
#[derive(Debug, Clone, Deserialize)]
pub struct LivestreamResult {
    #[serde(default)]
    pub channel_index: Vec<u32>,
    pub duration: f64,
    pub start: f64,
    pub is_final: bool,
    #[serde(default)]
    pub speech_final: bool,
    pub channel: Channel,
}

/// Results for one audio channel.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub alternatives: Vec<Alternative>,
}

/// One candidate transcript for a channel.
#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f64,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// One recognized word with its timing.
#[derive(Debug, Clone, Deserialize)]
pub struct Word {
    pub word: String,
    pub confidence: f64,
    pub start: f64,
    pub end: f64,
    /// Present when punctuation or smart formatting is enabled.
    #[serde(default)]
    pub punctuated_word: Option<String>,
    /// Present when diarization is enabled.
    #[serde(default)]
    pub speaker: Option<u32>,
}

/// Complete response from the prerecorded endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Transcription {
    pub metadata: Metadata,
    pub results: TranscriptionResults,
}

/// Result container of a prerecorded transcription.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResults {
    pub channels: Vec<Channel>,
}
