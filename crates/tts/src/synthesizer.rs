use std::time::Duration;

use async_trait::async_trait;
use dubcast_config::TtsConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::TtsError,
    http_client::http_client,
    provider::SpeechProvider,
    types::SpeechRequest,
    upload::ObjectUploader,
};

/// Turns one chunk of text into a durable audio reference
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` and return where the audio lives
    ///
    /// `segment_key` is stable across retries of the same segment, so the
    /// backend can overwrite rather than accumulate objects. The returned
    /// reference is not yet normalized (it may be `gs://...`).
    async fn synthesize(&self, text: &str, segment_key: &str) -> crate::error::Result<String>;
}

/// Synthesis function that stores the audio itself
///
/// `POST {"text", "segmentId"}` answered by `{"audioUrl"}`.
pub struct RemoteSynthesizer {
    client: Client,
    url: Url,
    api_key: Option<SecretString>,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteRequest<'a> {
    text: &'a str,
    segment_id: &'a str,
}

#[derive(Deserialize)]
struct RemoteResponse {
    #[serde(rename = "audioUrl", alias = "audio_url", alias = "url")]
    audio_url: Option<String>,
}

impl RemoteSynthesizer {
    pub fn new(url: &str, api_key: Option<SecretString>, timeout: Duration) -> crate::error::Result<Self> {
        let url = Url::parse(url).map_err(|e| TtsError::Config(format!("invalid tts.base_url: {e}")))?;

        Ok(Self {
            client: http_client(),
            url,
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl Synthesizer for RemoteSynthesizer {
    async fn synthesize(&self, text: &str, segment_key: &str) -> crate::error::Result<String> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(&RemoteRequest {
                text,
                segment_id: segment_key,
            });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| TtsError::from_send("synthesis function", &e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::from_status(status.as_u16(), message));
        }

        let body: RemoteResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TtsError::Timeout
            } else {
                TtsError::InvalidResponse(e.to_string())
            }
        })?;

        body.audio_url
            .filter(|reference| !reference.trim().is_empty())
            .ok_or_else(|| TtsError::InvalidResponse("synthesis function returned no audio reference".to_owned()))
    }
}

/// Speech provider followed by an object storage upload
pub struct UploadingSynthesizer {
    provider: Box<dyn SpeechProvider>,
    uploader: ObjectUploader,
    model: Option<String>,
    voice: String,
    response_format: String,
    speed: Option<f64>,
}

impl UploadingSynthesizer {
    pub fn new(provider: Box<dyn SpeechProvider>, uploader: ObjectUploader, config: &TtsConfig, voice: String) -> Self {
        Self {
            provider,
            uploader,
            model: config.model.clone(),
            voice,
            response_format: config.response_format.clone(),
            speed: config.speed,
        }
    }
}

#[async_trait]
impl Synthesizer for UploadingSynthesizer {
    async fn synthesize(&self, text: &str, segment_key: &str) -> crate::error::Result<String> {
        let request = SpeechRequest {
            model: self.model.as_deref().unwrap_or_else(|| self.provider.default_model()),
            input: text,
            voice: &self.voice,
            response_format: &self.response_format,
            speed: self.speed,
        };

        let audio = self.provider.speak(&request).await?;

        let object = self.uploader.object_name(segment_key, &self.response_format);
        self.uploader.upload(&object, audio).await
    }
}
