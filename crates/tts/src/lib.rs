//! Speech synthesis for transcript segments
//!
//! A [`Synthesizer`] turns one chunk of text into a durable audio reference.
//! Either a remote synthesis function does everything, or a speech provider
//! returns raw audio that is then uploaded to object storage.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod http_client;
mod provider;
mod synthesizer;
mod types;
mod upload;

use std::sync::Arc;

use dubcast_config::{TtsConfig, TtsProviderType};
use secrecy::SecretString;

pub use error::{Result, TtsError};
pub use provider::SpeechProvider;
pub use synthesizer::{RemoteSynthesizer, Synthesizer, UploadingSynthesizer};
pub use types::{SpeechAudio, SpeechRequest};
pub use upload::ObjectUploader;

use provider::{elevenlabs::ElevenLabsProvider, openai_tts::OpenAiTtsProvider};

/// Build the configured synthesizer
pub fn build_synthesizer(config: &TtsConfig) -> Result<Arc<dyn Synthesizer>> {
    let synthesizer: Arc<dyn Synthesizer> = match config.provider_type {
        TtsProviderType::Remote => {
            let url = config
                .base_url
                .as_deref()
                .ok_or_else(|| TtsError::Config("tts.base_url is required for remote synthesis".to_owned()))?;
            Arc::new(RemoteSynthesizer::new(url, config.api_key.clone(), config.timeout)?)
        }
        TtsProviderType::OpenaiTts => {
            let provider = OpenAiTtsProvider::new(resolve_api_key(config)?, config.base_url.clone(), config.timeout);
            uploading(config, Box::new(provider))?
        }
        TtsProviderType::Elevenlabs => {
            let provider = ElevenLabsProvider::new(resolve_api_key(config)?, config.base_url.clone(), config.timeout);
            uploading(config, Box::new(provider))?
        }
    };

    tracing::debug!(provider = ?config.provider_type, "speech synthesis initialized");
    Ok(synthesizer)
}

fn uploading(config: &TtsConfig, provider: Box<dyn SpeechProvider>) -> Result<Arc<dyn Synthesizer>> {
    let upload = config
        .upload
        .as_ref()
        .ok_or_else(|| TtsError::Config("tts.upload is required for this provider".to_owned()))?;
    let voice = config
        .voice
        .clone()
        .ok_or_else(|| TtsError::Config("tts.voice is required for this provider".to_owned()))?;

    let uploader = ObjectUploader::new(upload, config.timeout);
    Ok(Arc::new(UploadingSynthesizer::new(provider, uploader, config, voice)))
}

fn resolve_api_key(config: &TtsConfig) -> Result<SecretString> {
    config
        .api_key
        .clone()
        .ok_or_else(|| TtsError::Config(format!("API key required for TTS provider {:?}", config.provider_type)))
}
