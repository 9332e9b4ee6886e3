//! Prerecorded endpoint options.

use std::time::Duration;

use url::Url;

use crate::error::DeepgramError;
use crate::options::{TranscriptionOptions, bool_str};
use crate::routes;

/// Options for a prerecorded (batch) transcription request.
#[derive(Debug, Clone, Default)]
pub struct PrerecordedOptions {
    /// Options shared with the livestream endpoint.
    pub common: TranscriptionOptions,
    /// Detect the spoken language instead of assuming one.
    pub detect_language: Option<bool>,
    /// Group the transcript into paragraphs.
    pub paragraphs: Option<bool>,
    /// Produce a summary of the audio.
    pub summarize: Option<bool>,
    /// Detect topics discussed in the audio.
    pub detect_topics: Option<bool>,
    /// Segment the transcript into utterances.
    pub utterances: Option<bool>,
    /// Silence gap that splits utterances. Sent as seconds.
    pub utt_split: Option<Duration>,
    /// Convert spoken measurements to abbreviations.
    pub measurements: Option<bool>,
    /// Convert spoken dictation commands to punctuation.
    pub dictation: Option<bool>,
}

impl PrerecordedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full request URL for this option set.
    pub(crate) fn build_url(&self, base: &Url) -> Result<Url, DeepgramError> {
        let mut url = routes::listen_url(base)?;
        self.common.append_to(&mut url);
        {
            let mut query = url.query_pairs_mut();
            if let Some(detect) = self.detect_language {
                query.append_pair("detect_language", bool_str(detect));
            }
            if let Some(paragraphs) = self.paragraphs {
                query.append_pair("paragraphs", bool_str(paragraphs));
            }
            if let Some(summarize) = self.summarize {
                query.append_pair("summarize", bool_str(summarize));
            }
            if let Some(topics) = self.detect_topics {
                query.append_pair("detect_topics", bool_str(topics));
            }
            if let Some(utterances) = self.utterances {
                query.append_pair("utterances", bool_str(utterances));
            }
            if let Some(split) = self.utt_split {
                query.append_pair("utt_split", &split.as_secs_f64().to_string());
            }
            if let Some(measurements) = self.measurements {
                query.append_pair("measurements", bool_str(measurements));
            }
            if let Some(dictation) = self.dictation {
                query.append_pair("dictation", bool_str(dictation));
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}
