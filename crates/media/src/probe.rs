use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dubcast_config::{ProbeConfig, ProbeType};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{MediaError, Result};

/// Measures the playback duration of a remote audio file
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds, validated to be finite and positive
    async fn duration(&self, url: &Url) -> Result<f64>;
}

/// Build the configured probe
pub fn build_probe(config: &ProbeConfig) -> Result<Arc<dyn DurationProbe>> {
    match config.probe_type {
        ProbeType::Ffprobe => Ok(Arc::new(FfprobeProbe::new(&config.ffprobe_path, config.timeout))),
        ProbeType::Remote => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| MediaError::Config("probe.url is required for the remote probe".to_owned()))?;
            Ok(Arc::new(RemoteProbe::new(url, config.timeout)?))
        }
    }
}

/// Reject durations no playlist entry can carry
pub fn validate_duration(seconds: f64) -> Result<f64> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(MediaError::InvalidDuration(seconds))
    }
}

/// Runs `ffprobe` against the remote file
pub struct FfprobeProbe {
    program: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

impl FfprobeProbe {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_owned(),
            timeout,
        }
    }
}

fn parse_ffprobe(stdout: &[u8]) -> Result<f64> {
    let output: FfprobeOutput =
        serde_json::from_slice(stdout).map_err(|e| MediaError::Probe(format!("failed to parse ffprobe output: {e}")))?;

    let raw = output
        .format
        .and_then(|format| format.duration)
        .ok_or_else(|| MediaError::Probe("ffprobe output missing duration".to_owned()))?;

    raw.trim()
        .parse::<f64>()
        .map_err(|_| MediaError::Probe(format!("ffprobe reported non-numeric duration `{raw}`")))
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn duration(&self, url: &Url) -> Result<f64> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(url.as_str())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| MediaError::ProbeTimeout)?
            .map_err(|e| MediaError::Probe(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(url = %url, status = %output.status, "ffprobe failed: {}", stderr.trim());
            return Err(MediaError::Probe(format!("ffprobe exited with {}", output.status)));
        }

        validate_duration(parse_ffprobe(&output.stdout)?)
    }
}

/// Remote audio-length service
///
/// `POST {"audioUrl"}` answered by `{"duration": <seconds>}`.
pub struct RemoteProbe {
    client: reqwest::Client,
    url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteProbeRequest<'a> {
    audio_url: &'a str,
}

#[derive(Deserialize)]
struct RemoteProbeResponse {
    duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteProbe {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl DurationProbe for RemoteProbe {
    async fn duration(&self, url: &Url) -> Result<f64> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&RemoteProbeRequest { audio_url: url.as_str() })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MediaError::ProbeTimeout
                } else {
                    MediaError::Probe(format!("probe service unreachable: {e}"))
                }
            })?;

        let status = response.status();
        let body: RemoteProbeResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Probe(format!("invalid probe response ({status}): {e}")))?;

        match (body.duration, body.error) {
            (Some(seconds), _) if status.is_success() => validate_duration(seconds),
            (_, Some(error)) => Err(MediaError::Probe(error)),
            _ => Err(MediaError::Probe(format!("probe service returned {status}"))),
        }
    }
}
