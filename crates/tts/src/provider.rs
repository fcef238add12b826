pub mod elevenlabs;
pub mod openai_tts;

use async_trait::async_trait;

use crate::types::{SpeechAudio, SpeechRequest};

/// Provider that turns text into raw audio bytes
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn speak(&self, request: &SpeechRequest<'_>) -> crate::error::Result<SpeechAudio>;

    /// Model used when none is configured
    fn default_model(&self) -> &str;

    fn name(&self) -> &str;
}

/// Read a successful provider response into [`SpeechAudio`]
pub(crate) async fn read_audio(provider: &str, response: reqwest::Response) -> crate::error::Result<SpeechAudio> {
    use crate::error::TtsError;

    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_owned());
        tracing::error!(provider, status = %status, "speech provider error: {error_text}");
        return Err(TtsError::from_status(status.as_u16(), error_text));
    }

    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/mpeg")
        .to_owned();

    let audio = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::InvalidResponse(format!("failed to read {provider} audio: {e}"))
        }
    })?;

    if audio.is_empty() {
        return Err(TtsError::InvalidResponse(format!("{provider} returned no audio")));
    }

    tracing::debug!(provider, bytes = audio.len(), "speech synthesis complete");

    Ok(SpeechAudio { audio, content_type })
}
