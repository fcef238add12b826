use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Audio duration probe configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    #[serde(rename = "type", default)]
    pub probe_type: ProbeType,
    /// `ffprobe` executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Remote probe endpoint taking `{audioUrl}` and returning `{duration}`
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default = "default_timeout", deserialize_with = "crate::deserialize_duration")]
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe_type: ProbeType::default(),
            ffprobe_path: default_ffprobe_path(),
            url: None,
            timeout: default_timeout(),
        }
    }
}

/// Supported duration probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeType {
    /// Run `ffprobe` locally against the remote file
    #[default]
    Ffprobe,
    /// Ask a remote audio-length service
    Remote,
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_owned()
}
const fn default_timeout() -> Duration {
    Duration::from_secs(20)
}
