use std::time::Duration;

use serde::Deserialize;

/// Segment delivery proxy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// `Retry-After` seconds sent while a segment is still being synthesized
    #[serde(default = "default_processing_retry_after")]
    pub processing_retry_after: u64,
    /// Deadline for fetching segment audio from the origin
    #[serde(default = "default_fetch_timeout", deserialize_with = "crate::deserialize_duration")]
    pub fetch_timeout: Duration,
    /// Client retries answered with a deferral before a hard failure
    #[serde(default = "default_max_fetch_retries")]
    pub max_fetch_retries: u32,
    /// Base `Retry-After` seconds for origin failures, multiplied by the retry number
    #[serde(default = "default_upstream_retry_after")]
    pub upstream_retry_after: u64,
    /// Hosts a direct `url=` reference may resolve to
    ///
    /// Empty means only the storage public host is allowed.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            processing_retry_after: default_processing_retry_after(),
            fetch_timeout: default_fetch_timeout(),
            max_fetch_retries: default_max_fetch_retries(),
            upstream_retry_after: default_upstream_retry_after(),
            allowed_hosts: Vec::new(),
        }
    }
}

const fn default_processing_retry_after() -> u64 {
    2
}
const fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}
const fn default_max_fetch_retries() -> u32 {
    3
}
const fn default_upstream_retry_after() -> u64 {
    1
}
