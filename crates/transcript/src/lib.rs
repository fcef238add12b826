//! Transcript acquisition
//!
//! The platform's caption data is fetched through an HTTP service that
//! answers `GET <base_url>?videoId=<key>&lang=<language>`.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod http;

use std::sync::Arc;

use async_trait::async_trait;
use dubcast_config::TranscriptConfig;
use dubcast_core::VideoKey;

pub use error::{Result, TranscriptError};
pub use http::HttpTranscriptSource;

/// Source of the plain-text transcript of a video
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the full transcript as one string
    async fn fetch(&self, video: &VideoKey) -> Result<String>;
}

/// Build the configured transcript source
pub fn build(config: &TranscriptConfig) -> Result<Arc<dyn TranscriptSource>> {
    Ok(Arc::new(HttpTranscriptSource::new(config)?))
}
