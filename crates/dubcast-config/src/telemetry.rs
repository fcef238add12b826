use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Logging and OpenTelemetry export
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Extra resource attributes attached to every span and metric
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Spans and metrics are only exported when this is set
    #[serde(default)]
    pub otlp: Option<OtlpConfig>,
}

/// Stdout log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// OTLP collector shared by traces and metrics
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtlpConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: OtlpProtocol,
    /// How often metrics are pushed
    #[serde(default = "default_metrics_interval", deserialize_with = "crate::deserialize_duration")]
    pub metrics_interval: Duration,
    /// Fraction of root traces kept, between 0.0 and 1.0
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
    /// Follow the caller's sampling decision when a trace is propagated
    #[serde(default = "default_parent_based")]
    pub parent_based: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    HttpProto,
}

fn default_service_name() -> String {
    "dubcast".to_owned()
}

const fn default_metrics_interval() -> Duration {
    Duration::from_secs(30)
}

const fn default_sampling_ratio() -> f64 {
    1.0
}

const fn default_parent_based() -> bool {
    true
}
