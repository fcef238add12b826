//! Whole-transcript translation
//!
//! A video's transcript is translated once, before it is chunked, so every
//! segment carries text in the target language.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod provider;

use std::sync::Arc;

use async_trait::async_trait;
use dubcast_config::{TranslationConfig, TranslationProviderType};

pub use error::{Result, TranslationError};
pub use provider::{chat::ChatTranslator, noop::NoopTranslator, remote::RemoteTranslator};

/// Translates transcript text into the configured target language
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;

    /// Backend name, used in logs
    fn name(&self) -> &str;
}

/// Build the configured translator
pub fn build(config: &TranslationConfig) -> Result<Arc<dyn Translator>> {
    let translator: Arc<dyn Translator> = match config.provider_type {
        TranslationProviderType::Noop => Arc::new(NoopTranslator),
        TranslationProviderType::Remote => Arc::new(RemoteTranslator::new(config)?),
        TranslationProviderType::Openai => Arc::new(ChatTranslator::new(config)?),
    };

    tracing::debug!(backend = translator.name(), "translation backend initialized");
    Ok(translator)
}

pub(crate) fn http_client(config: &TranslationConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| TranslationError::Config(format!("failed to build HTTP client: {e}")))
}
