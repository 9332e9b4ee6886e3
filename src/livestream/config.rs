//! Livestream endpoint options.

use std::time::Duration;

use url::Url;

use crate::error::DeepgramError;
use crate::options::{TranscriptionOptions, bool_str};
use crate::routes;

/// Audio container/codec of the streamed audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// 16-bit little-endian signed PCM.
    Linear16,
    /// Free Lossless Audio Codec.
    Flac,
    /// Mu-law encoded PCM.
    Mulaw,
    /// Adaptive Multi-Rate narrowband.
    AmrNb,
    /// Adaptive Multi-Rate wideband.
    AmrWb,
    /// Opus in an Ogg container.
    Opus,
    /// Speex in an Ogg container.
    Speex,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "linear16",
            AudioEncoding::Flac => "flac",
            AudioEncoding::Mulaw => "mulaw",
            AudioEncoding::AmrNb => "amr-nb",
            AudioEncoding::AmrWb => "amr-wb",
            AudioEncoding::Opus => "opus",
            AudioEncoding::Speex => "speex",
        }
    }
}

/// Options for a livestream session.
#[derive(Debug, Clone, Default)]
pub struct LivestreamOptions {
    /// Options shared with the prerecorded endpoint.
    pub common: TranscriptionOptions,
    /// Deliver interim (non-final) transcripts as audio arrives.
    pub interim_results: Option<bool>,
    /// Silence duration after which a speech segment is finalized.
    /// Sent as whole milliseconds.
    pub endpointing: Option<Duration>,
    /// Number of independent audio channels.
    pub channels: Option<u32>,
    /// Sample rate in hertz. Required for raw encodings such as `linear16`.
    pub sample_rate: Option<u32>,
    /// Encoding of the streamed audio.
    pub encoding: Option<AudioEncoding>,
}

impl LivestreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full WebSocket URL for this option set.
    pub(crate) fn build_websocket_url(&self, base: &Url) -> Result<Url, DeepgramError> {
        let mut url = routes::livestream_url(base)?;
        self.common.append_to(&mut url);
        {
            let mut query = url.query_pairs_mut();
            if let Some(interim) = self.interim_results {
                query.append_pair("interim_results", bool_str(interim));
            }
            if let Some(endpointing) = self.endpointing {
                query.append_pair("endpointing", &endpointing.as_millis().to_string());
            }
            if let Some(channels) = self.channels {
                query.append_pair("channels", &channels.to_string());
            }
            if let Some(rate) = self.sample_rate {
                query.append_pair("sample_rate", &rate.to_string());
            }
            if let Some(encoding) = self.encoding {
                query.append_pair("encoding", encoding.as_str());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}
