use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Transcript translation configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationConfig {
    /// Translation backend
    #[serde(rename = "type", default)]
    pub provider_type: TranslationProviderType,
    /// Endpoint (remote function URL, or chat-completions base URL)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// API key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Chat model used by the `openai` backend
    #[serde(default = "default_model")]
    pub model: String,
    /// Language the transcript is translated into
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_timeout", deserialize_with = "crate::deserialize_duration")]
    pub timeout: Duration,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider_type: TranslationProviderType::default(),
            base_url: None,
            api_key: None,
            model: default_model(),
            target_language: default_target_language(),
            timeout: default_timeout(),
        }
    }
}

/// Supported translation backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationProviderType {
    /// Pass the transcript through unchanged
    #[default]
    Noop,
    /// Remote preprocessing function taking `{transcripts}` and returning `{processed_transcript}`
    Remote,
    /// OpenAI-compatible chat completions (`OpenAI`, `DeepSeek`, ...)
    Openai,
}

fn default_model() -> String {
    "deepseek-chat".to_owned()
}
fn default_target_language() -> String {
    "Vietnamese".to_owned()
}
const fn default_timeout() -> Duration {
    Duration::from_secs(120)
}
