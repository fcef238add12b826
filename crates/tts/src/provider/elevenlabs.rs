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

const DEFAULT_ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";

/// `ElevenLabs` speech provider
pub(crate) struct ElevenLabsProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl ElevenLabsProvider {
    pub fn new(api_key: SecretString, base_url: Option<String>, timeout: Duration) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_ELEVENLABS_API_URL.to_owned());

        Self {
            client: http_client(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            timeout,
        }
    }
}

#[derive(serde::Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// `ElevenLabs` encodes the container in an `output_format` query parameter
fn output_format(response_format: &str) -> &'static str {
    match response_format {
        "pcm" | "wav" => "pcm_44100",
        "opus" => "opus_48000_128",
        _ => "mp3_44100_128",
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsProvider {
    async fn speak(&self, request: &SpeechRequest<'_>) -> crate::error::Result<SpeechAudio> {
        let url = format!("{}/text-to-speech/{}", self.base_url, request.voice);

        tracing::debug!(
            model = request.model,
            voice = request.voice,
            input_len = request.input.len(),
            "ElevenLabs TTS request"
        );

        let body = ElevenLabsRequest {
            text: request.input,
            model_id: request.model,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", output_format(request.response_format))])
            .header("xi-api-key", self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::from_send(self.name(), &e))?;

        super::read_audio(self.name(), response).await
    }

    fn default_model(&self) -> &str {
        "eleven_multilingual_v2"
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}
