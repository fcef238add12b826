//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use dubcast_config::{Config, CorsConfig, ProbeType, TranslationProviderType, TtsProviderType};

use super::upstream::MockUpstream;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Point every collaborator at `upstream`
    ///
    /// One segment per sentence of [`MockUpstream::sentences`], fast
    /// synthesis retries, and a short origin timeout.
    pub fn new(upstream: &MockUpstream) -> Self {
        let mut config = Config::default();

        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.pipeline.chunk_max_bytes = 16;
        config.pipeline.batch_size = 5;
        config.pipeline.retry.base_delay = Duration::from_millis(10);
        config.delivery.fetch_timeout = Duration::from_millis(500);

        config.transcript.base_url = Some(upstream.url("/transcript").parse().expect("valid URL"));
        config.tts.provider_type = TtsProviderType::Remote;
        config.tts.base_url = Some(upstream.url("/synthesize"));
        config.probe.probe_type = ProbeType::Remote;
        config.probe.url = Some(upstream.url("/audio-length").parse().expect("valid URL"));

        Self { config }
    }

    pub fn with_remote_translation(mut self, upstream: &MockUpstream) -> Self {
        self.config.translation.provider_type = TranslationProviderType::Remote;
        self.config.translation.base_url = Some(upstream.url("/translate").parse().expect("valid URL"));
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.pipeline.batch_size = batch_size;
        self
    }

    /// Only advance through explicit batch calls and segment requests
    pub fn without_playlist_advance(mut self) -> Self {
        self.config.pipeline.advance_on_playlist = false;
        self
    }

    pub fn with_public_base_url(mut self, url: &str) -> Self {
        self.config.server.public_base_url = Some(url.parse().expect("valid URL"));
        self
    }

    pub fn with_allowed_hosts(mut self, hosts: &[&str]) -> Self {
        self.config.delivery.allowed_hosts = hosts.iter().map(|h| (*h).to_owned()).collect();
        self
    }

    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
