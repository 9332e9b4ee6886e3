//! Query-string option collections shared by the transcription endpoints.

use url::Url;

use crate::tier::Tier;

/// Options accepted by every transcription endpoint.
///
/// Unset fields are omitted from the query string entirely so the server's
/// defaults apply. Endpoint-specific extras live in
/// [`crate::livestream::LivestreamOptions`] and
/// [`crate::prerecorded::PrerecordedOptions`], both of which embed this set.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionOptions {
    /// Model identifier, e.g. `general` or `nova-2-medical`.
    pub model: Option<String>,
    /// Model tier.
    pub tier: Option<Tier>,
    /// Model version; `latest` when unset.
    pub version: Option<String>,
    /// BCP-47 language tag, e.g. `en-US`.
    pub language: Option<String>,
    /// Add punctuation and capitalization.
    pub punctuate: Option<bool>,
    /// Replace profanity in the transcript.
    pub profanity_filter: Option<bool>,
    /// Content categories to redact; each entry becomes its own
    /// `redact` parameter.
    pub redact: Vec<String>,
    /// Assign speaker labels.
    pub diarize: Option<bool>,
    /// Apply formatting to dates, numbers and similar spans.
    pub smart_format: Option<bool>,
    /// Keep filler words such as "uh" in the transcript.
    pub filler_words: Option<bool>,
}

impl TranscriptionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the set options to a URL's query string.
    pub(crate) fn append_to(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        if let Some(model) = &self.model {
            query.append_pair("model", model);
        }
        if let Some(tier) = self.tier {
            query.append_pair("tier", tier.as_str());
        }
        if let Some(version) = &self.version {
            query.append_pair("version", version);
        }
        if let Some(language) = &self.language {
            query.append_pair("language", language);
        }
        if let Some(punctuate) = self.punctuate {
            query.append_pair("punctuate", bool_str(punctuate));
        }
        if let Some(filter) = self.profanity_filter {
            query.append_pair("profanity_filter", bool_str(filter));
        }
        for category in &self.redact {
            query.append_pair("redact", category);
        }
        if let Some(diarize) = self.diarize {
            query.append_pair("diarize", bool_str(diarize));
        }
        if let Some(smart) = self.smart_format {
            query.append_pair("smart_format", bool_str(smart));
        }
        if let Some(filler) = self.filler_words {
            query.append_pair("filler_words", bool_str(filler));
        }
    }
}

pub(crate) fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
