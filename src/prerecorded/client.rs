//! One-shot batch transcription over HTTP.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::client::DeepgramClient;
use crate::entities::Transcription;
use crate::error::DeepgramError;
use crate::prerecorded::config::PrerecordedOptions;

#[derive(Debug, Serialize)]
struct UrlPayload<'a> {
    url: &'a str,
}

/// The prerecorded (batch) transcription surface.
///
/// Obtained from [`DeepgramClient::prerecorded`].
#[derive(Debug, Clone)]
pub struct PrerecordedApi {
    client: DeepgramClient,
}

impl PrerecordedApi {
    pub(crate) fn new(client: DeepgramClient) -> Self {
        Self { client }
    }

    /// Transcribe raw audio bytes.
    ///
    /// `content_type` describes the container, e.g. `audio/wav`.
    pub async fn transcribe(
        &self,
        audio: Bytes,
        content_type: &str,
        options: &PrerecordedOptions,
    ) -> Result<Transcription, DeepgramError> {
        let url = options.build_url(self.client.base_url())?;
        let request = self
            .client
            .http()
            .post(url)
            .header(AUTHORIZATION, self.client.authorization_value())
            .header(CONTENT_TYPE, content_type)
            .body(audio);
        self.execute(request).await
    }

    /// Transcribe audio hosted at a URL the Deepgram servers can reach.
    pub async fn transcribe_url(
        &self,
        audio_url: &str,
        options: &PrerecordedOptions,
    ) -> Result<Transcription, DeepgramError> {
        let url = options.build_url(self.client.base_url())?;
        let request = self
            .client
            .http()
            .post(url)
            .header(AUTHORIZATION, self.client.authorization_value())
            .json(&UrlPayload { url: audio_url });
        self.execute(request).await
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Transcription, DeepgramError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(DeepgramError::from_response(status.as_u16(), &body));
        }
        Ok(response.json().await?)
    }
}
