use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    error::TtsError,
    http_client::http_client,
    types::{SpeechAudio, SpeechRequest},
};

use super::SpeechProvider;

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` speech provider
pub(crate) struct OpenAiTtsProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl OpenAiTtsProvider {
    pub fn new(api_key: SecretString, base_url: Option<String>, timeout: Duration) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_owned());

        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            timeout,
        }
    }
}

#[derive(serde::Serialize)]
struct OpenAiTtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
}

#[async_trait]
impl SpeechProvider for OpenAiTtsProvider {
    async fn speak(&self, request: &SpeechRequest<'_>) -> crate::error::Result<SpeechAudio> {
        let url = format!("{}/audio/speech", self.base_url);

        tracing::debug!(
            model = request.model,
            voice = request.voice,
            input_len = request.input.len(),
            "OpenAI TTS request"
        );

        let body = OpenAiTtsRequest {
            model: request.model,
            input: request.input,
            voice: request.voice,
            response_format: request.response_format,
            speed: request.speed,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::from_send(self.name(), &e))?;

        super::read_audio(self.name(), response).await
    }

    fn default_model(&self) -> &str {
        "tts-1"
    }

    fn name(&self) -> &str {
        "openai"
    }
}
