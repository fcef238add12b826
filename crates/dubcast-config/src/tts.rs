use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Speech synthesis configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// Provider type
    #[serde(rename = "type", default)]
    pub provider_type: TtsProviderType,
    /// API key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override (required for `remote`)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model identifier (e.g. "tts-1" or "`eleven_multilingual_v2`")
    #[serde(default)]
    pub model: Option<String>,
    /// Voice identifier
    #[serde(default)]
    pub voice: Option<String>,
    /// Output audio format requested from the provider
    #[serde(default = "default_response_format")]
    pub response_format: String,
    /// Speech speed multiplier (0.25 to 4.0)
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default = "default_timeout", deserialize_with = "crate::deserialize_duration")]
    pub timeout: Duration,
    /// Where synthesized audio is uploaded when the provider returns raw bytes
    #[serde(default)]
    pub upload: Option<UploadConfig>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider_type: TtsProviderType::default(),
            api_key: None,
            base_url: None,
            model: None,
            voice: None,
            response_format: default_response_format(),
            speed: None,
            timeout: default_timeout(),
            upload: None,
        }
    }
}

/// Supported TTS providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProviderType {
    /// Remote synthesis function returning a durable audio reference
    #[default]
    Remote,
    /// `OpenAI` TTS
    OpenaiTts,
    /// `ElevenLabs`
    Elevenlabs,
}

impl TtsProviderType {
    /// Whether the provider returns raw audio that must be uploaded
    pub const fn returns_audio(self) -> bool {
        matches!(self, Self::OpenaiTts | Self::Elevenlabs)
    }
}

/// Object storage upload target (Google Cloud Storage JSON API)
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Destination bucket
    pub bucket: String,
    /// Object name prefix (e.g. "segments/")
    #[serde(default)]
    pub prefix: String,
    /// OAuth access token with write access to the bucket
    #[serde(default)]
    pub access_token: Option<SecretString>,
    /// Upload API origin override
    #[serde(default = "default_upload_base")]
    pub api_base: Url,
}

fn default_response_format() -> String {
    "mp3".to_owned()
}
const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_upload_base() -> Url {
    Url::parse("https://storage.googleapis.com").expect("valid default URL")
}
