use std::time::Duration;

use serde::Deserialize;

/// Segment chunking and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Upper bound on the UTF-8 size of one synthesized text chunk
    #[serde(default = "default_chunk_max_bytes")]
    pub chunk_max_bytes: usize,
    /// Segments synthesized per `advance` when the caller gives no count
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Largest lookahead a caller may request in one `advance`
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Start a background batch whenever an incomplete playlist is polled
    #[serde(default = "default_advance_on_playlist")]
    pub advance_on_playlist: bool,
    /// How long a processing claim is honoured before another flow may take it over
    #[serde(default = "default_claim_lease", deserialize_with = "crate::deserialize_duration")]
    pub claim_lease: Duration,
    /// Per-segment synthesis retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_max_bytes: default_chunk_max_bytes(),
            batch_size: default_batch_size(),
            max_batch_size: default_max_batch_size(),
            advance_on_playlist: default_advance_on_playlist(),
            claim_lease: default_claim_lease(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after that
    #[serde(default = "default_base_delay", deserialize_with = "crate::deserialize_duration")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
        }
    }
}

const fn default_chunk_max_bytes() -> usize {
    480
}
const fn default_batch_size() -> usize {
    5
}
const fn default_max_batch_size() -> usize {
    50
}
const fn default_advance_on_playlist() -> bool {
    true
}
const fn default_claim_lease() -> Duration {
    Duration::from_secs(300)
}
const fn default_max_attempts() -> u32 {
    3
}
const fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}
