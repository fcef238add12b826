use std::path::Path;
use std::time::Duration;

use crate::{Config, ProbeType, StoreConfig, TranslationProviderType, TtsProviderType};

/// Smallest chunk size that still fits a short sentence
const MIN_CHUNK_BYTES: usize = 16;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::debug!(
            batch_size = config.pipeline.batch_size,
            chunk_max_bytes = config.pipeline.chunk_max_bytes,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistent setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_pipeline()?;
        self.validate_collaborators()?;
        self.validate_store()?;
        Ok(())
    }

    fn validate_pipeline(&self) -> anyhow::Result<()> {
        let pipeline = &self.pipeline;

        if pipeline.batch_size == 0 {
            anyhow::bail!("pipeline.batch_size must be greater than 0");
        }

        if pipeline.batch_size > pipeline.max_batch_size {
            anyhow::bail!(
                "pipeline.batch_size ({}) exceeds pipeline.max_batch_size ({})",
                pipeline.batch_size,
                pipeline.max_batch_size
            );
        }

        if pipeline.chunk_max_bytes < MIN_CHUNK_BYTES {
            anyhow::bail!("pipeline.chunk_max_bytes must be at least {MIN_CHUNK_BYTES}");
        }

        if pipeline.retry.max_attempts == 0 {
            anyhow::bail!("pipeline.retry.max_attempts must be at least 1");
        }

        if pipeline.claim_lease.is_zero() {
            anyhow::bail!("pipeline.claim_lease must be greater than 0");
        }

        let synthesis = self.worst_case_synthesis();
        if pipeline.claim_lease < synthesis {
            anyhow::bail!(
                "pipeline.claim_lease ({:?}) is shorter than one segment's worst-case synthesis time ({synthesis:?})",
                pipeline.claim_lease
            );
        }

        if self.delivery.fetch_timeout.is_zero() {
            anyhow::bail!("delivery.fetch_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Longest a claimed segment can take: every attempt timing out on both
    /// the provider and the probe, plus the backoff between attempts
    fn worst_case_synthesis(&self) -> Duration {
        let retry = &self.pipeline.retry;
        let per_attempt = self.tts.timeout.saturating_add(self.probe.timeout);
        let attempts = per_attempt.saturating_mul(retry.max_attempts);
        // base * (2^(n-1) - 1) across the n-1 waits
        let doublings = 2_u32.saturating_pow(retry.max_attempts.saturating_sub(1)).saturating_sub(1);
        attempts.saturating_add(retry.base_delay.saturating_mul(doublings))
    }

    /// Every external collaborator must be reachable
    fn validate_collaborators(&self) -> anyhow::Result<()> {
        if self.transcript.base_url.is_none() {
            anyhow::bail!("transcript.base_url must be configured");
        }

        if self.translation.provider_type != TranslationProviderType::Noop && self.translation.base_url.is_none() {
            anyhow::bail!("translation.base_url is required for the configured translation backend");
        }

        match self.tts.provider_type {
            TtsProviderType::Remote => {
                if self.tts.base_url.is_none() {
                    anyhow::bail!("tts.base_url is required for the remote synthesis provider");
                }
            }
            TtsProviderType::OpenaiTts | TtsProviderType::Elevenlabs => {
                if self.tts.api_key.is_none() {
                    anyhow::bail!("tts.api_key is required for the configured TTS provider");
                }
                if self.tts.voice.is_none() {
                    anyhow::bail!("tts.voice is required for the configured TTS provider");
                }
                let Some(upload) = self.tts.upload.as_ref() else {
                    anyhow::bail!("tts.upload must be configured when the TTS provider returns raw audio");
                };
                if upload.bucket.trim().is_empty() {
                    anyhow::bail!("tts.upload.bucket must not be empty");
                }
            }
        }

        if self.probe.probe_type == ProbeType::Remote && self.probe.url.is_none() {
            anyhow::bail!("probe.url is required for the remote duration probe");
        }

        Ok(())
    }

    fn validate_store(&self) -> anyhow::Result<()> {
        if let StoreConfig::Redis { url, .. } = &self.store
            && url.trim().is_empty()
        {
            anyhow::bail!("store.url must not be empty for the redis store");
        }

        Ok(())
    }
}
