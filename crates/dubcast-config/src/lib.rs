#![allow(clippy::must_use_candidate)]

pub mod cors;
pub mod delivery;
mod env;
pub mod health;
mod loader;
pub mod pipeline;
pub mod probe;
pub mod server;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod transcript;
pub mod translation;
pub mod tts;

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub use cors::*;
pub use delivery::*;
pub use health::*;
pub use pipeline::*;
pub use probe::*;
pub use server::*;
pub use storage::*;
pub use store::*;
pub use telemetry::TelemetryConfig;
pub use transcript::*;
pub use translation::*;
pub use tts::*;

/// Top-level dubcast configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Segment scheduling and chunking
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Segment delivery proxy
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Segment store backend
    #[serde(default)]
    pub store: StoreConfig,
    /// Transcript source
    #[serde(default)]
    pub transcript: TranscriptConfig,
    /// Transcript translation
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Speech synthesis
    #[serde(default)]
    pub tts: TtsConfig,
    /// Audio duration probe
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Object storage addressing
    #[serde(default)]
    pub storage: StorageConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

/// Deserialize a human-readable duration such as `"10s"` or `"5m"`
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
