//! Client facade holding credentials and the endpoint configuration.

use url::Url;

use crate::error::DeepgramError;
use crate::livestream::{LivestreamApi, LivestreamOptions};
use crate::prerecorded::PrerecordedApi;
use crate::routes;

/// `User-Agent` attached to every outbound request.
pub(crate) const USER_AGENT_VALUE: &str =
    concat!("deepgram-client/", env!("CARGO_PKG_VERSION"));

/// Entry point for the Deepgram API.
///
/// Holds the API key and the base endpoint, and hands out the livestream
/// and prerecorded surfaces. Cloning is cheap; the underlying HTTP client
/// pools connections.
#[derive(Debug, Clone)]
pub struct DeepgramClient {
    api_key: String,
    base_url: Url,
    http: reqwest::Client,
}

impl DeepgramClient {
    /// Create a client against the hosted Deepgram API.
    pub fn new(api_key: impl Into<String>) -> Result<Self, DeepgramError> {
        // DEFAULT_BASE_URL is a valid constant, parse cannot fail
        let base_url = Url::parse(routes::DEFAULT_BASE_URL)
            .map_err(|e| DeepgramError::ConnectionFailed(e.to_string()))?;
        Self::with_base_url(api_key, base_url)
    }

    /// Create a client against an alternate endpoint, e.g. a self-hosted
    /// deployment or a local test server.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: Url,
    ) -> Result<Self, DeepgramError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DeepgramError::AuthenticationFailed(
                "API key must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .build()?;

        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }

    /// The configured base endpoint.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Value of the `Authorization` header.
    pub(crate) fn authorization_value(&self) -> String {
        format!("Token {}", self.api_key)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Open a livestream transcription session.
    pub async fn create_livestream(
        &self,
        options: LivestreamOptions,
    ) -> Result<LivestreamApi, DeepgramError> {
        LivestreamApi::connect(self, options).await
    }

    /// The prerecorded (batch) transcription surface.
    pub fn prerecorded(&self) -> PrerecordedApi {
        PrerecordedApi::new(self.clone())
    }
}
