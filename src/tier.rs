//! Catalog of Deepgram model tiers and the models available in each.
//!
//! The tier and model names map directly onto the `tier` and `model`
//! query parameters of the transcription endpoints.

/// A Deepgram model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Base,
    Enhanced,
    Nova,
    Nova2,
    Whisper,
}

impl Tier {
    /// The value sent as the `tier` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Base => "base",
            Tier::Enhanced => "enhanced",
            Tier::Nova => "nova",
            Tier::Nova2 => "nova-2",
            Tier::Whisper => "whisper",
        }
    }

    /// Model identifiers available in this tier, usable as the `model`
    /// query parameter.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Tier::Base => &[
                "general",
                "meeting",
                "phonecall",
                "voicemail",
                "finance",
                "conversationalai",
                "video",
            ],
            Tier::Enhanced => &["general", "meeting", "phonecall", "finance"],
            Tier::Nova => &["general", "phonecall"],
            Tier::Nova2 => &[
                "general",
                "meeting",
                "phonecall",
                "voicemail",
                "finance",
                "conversationalai",
                "video",
                "medical",
                "drivethru",
                "automotive",
            ],
            Tier::Whisper => &["tiny", "base", "small", "medium", "large"],
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
