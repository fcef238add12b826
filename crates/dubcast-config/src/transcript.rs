use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Transcript source configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptConfig {
    /// Endpoint returning the plain-text transcript for `?videoId=<key>&lang=<language>`
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Bearer token sent to the transcript service
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Caption language requested from the platform
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timeout", deserialize_with = "crate::deserialize_duration")]
    pub timeout: Duration,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            language: default_language(),
            timeout: default_timeout(),
        }
    }
}

fn default_language() -> String {
    "en".to_owned()
}
const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
