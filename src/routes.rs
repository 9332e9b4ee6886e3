//! Endpoint catalog for the Deepgram API.

use url::Url;

use crate::error::DeepgramError;

/// Default base URL for the hosted Deepgram API.
pub const DEFAULT_BASE_URL: &str = "https://api.deepgram.com";

/// API version path segment.
pub const API_VERSION: &str = "v1";

/// Transcription endpoint, shared by livestream and prerecorded.
pub const LISTEN_PATH: &str = "listen";

/// Build the HTTP transcription URL from a base endpoint.
pub(crate) fn listen_url(base: &Url) -> Result<Url, DeepgramError> {
    base.join(&format!("/{API_VERSION}/{LISTEN_PATH}"))
        .map_err(|e| DeepgramError::ConnectionFailed(format!("Invalid base URL: {e}")))
}

/// Build the WebSocket livestream URL from a base endpoint.
///
/// The scheme is derived from the base: `https` becomes `wss`, `http`
/// becomes `ws` (the latter is what local mock servers use).
pub(crate) fn livestream_url(base: &Url) -> Result<Url, DeepgramError> {
    let mut url = listen_url(base)?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(DeepgramError::ConnectionFailed(format!(
                "Unsupported URL scheme: {other}"
            )));
        }
    };
    // set_scheme rejects https -> wss, so rebuild through a string
    let raw = format!("{scheme}{}", &url.as_str()[url.scheme().len()..]);
    url = Url::parse(&raw)
        .map_err(|e| DeepgramError::ConnectionFailed(format!("Invalid livestream URL: {e}")))?;
    Ok(url)
}
