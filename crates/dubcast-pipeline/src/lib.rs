//! The dubbing pipeline
//!
//! Turns a video's transcript into translated segments, synthesizes them
//! in bounded batches along a running timing cursor, and serves the result
//! as a growing HLS playlist whose entries resolve through the delivery
//! proxy.
//!
//! All segment state lives in the [`SegmentStore`]. Nothing here keeps
//! per-video state between calls beyond a per-process set of in-flight
//! background tasks, so several instances can share one store.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod bootstrap;
mod chunker;
mod delivery;
mod driver;
mod error;
mod inflight;
pub mod playlist;
mod scheduler;
mod status;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use dubcast_config::Config;
use dubcast_core::VideoKey;
use dubcast_store::{Segment, SegmentStore, VideoId};
use media::{AudioFetcher, DurationProbe};
use tracing::Instrument;
use transcript::TranscriptSource;
use translation::Translator;
use tts::Synthesizer;

pub use bootstrap::BootstrapOutcome;
pub use chunker::chunk;
pub use delivery::{Delivery, proxy_url};
pub use driver::{DriverError, SynthesisDriver, SynthesisFailure, Synthesized};
pub use error::{DeliveryError, FailureKind, PipelineError};
pub use scheduler::{BatchResult, Scheduler, SegmentFailure};
pub use status::{Availability, SegmentStatus, VideoStatus};

use crate::inflight::InFlight;

/// External services the pipeline talks to
pub struct Collaborators {
    pub store: Arc<dyn SegmentStore>,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub probe: Arc<dyn DurationProbe>,
}

impl Collaborators {
    /// Build every collaborator from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            store: dubcast_store::from_config(&config.store)?,
            transcripts: transcript::build(&config.transcript)?,
            translator: translation::build(&config.translation)?,
            synthesizer: tts::build_synthesizer(&config.tts)?,
            probe: media::build_probe(&config.probe)?,
        })
    }
}

/// Processed segments of a video, ready to render as a playlist
#[derive(Debug, Clone, Default)]
pub struct PlaylistSnapshot {
    pub segments: Vec<Segment>,
    /// Every segment of the video is processed
    pub complete: bool,
}

/// Entry point for every pipeline operation
pub struct Pipeline {
    config: Config,
    store: Arc<dyn SegmentStore>,
    transcripts: Arc<dyn TranscriptSource>,
    translator: Arc<dyn Translator>,
    scheduler: Scheduler,
    fetcher: AudioFetcher,
    bootstrapping: InFlight<VideoKey>,
    advancing: InFlight<VideoId>,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, config: Config) -> anyhow::Result<Self> {
        let Collaborators {
            store,
            transcripts,
            translator,
            synthesizer,
            probe,
        } = collaborators;

        let driver = SynthesisDriver::new(
            synthesizer,
            probe,
            Arc::clone(&store),
            config.storage.clone(),
            config.pipeline.retry.clone(),
        );
        let scheduler = Scheduler::new(Arc::clone(&store), driver, config.pipeline.claim_lease);
        let fetcher = AudioFetcher::new(config.delivery.fetch_timeout)?;

        Ok(Self {
            config,
            store,
            transcripts,
            translator,
            scheduler,
            fetcher,
            bootstrapping: InFlight::new(),
            advancing: InFlight::new(),
        })
    }

    /// Build the pipeline and all its collaborators from configuration
    pub fn from_config(config: Config) -> anyhow::Result<Arc<Self>> {
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Arc::new(Self::new(collaborators, config)?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process the next batch of a known video
    ///
    /// `count` defaults to the configured batch size and may not exceed
    /// the configured maximum.
    pub async fn advance(&self, key: &VideoKey, count: Option<usize>) -> Result<BatchResult, PipelineError> {
        let max = self.config.pipeline.max_batch_size;
        let batch_size = count.unwrap_or(self.config.pipeline.batch_size);
        if batch_size == 0 || batch_size > max {
            return Err(PipelineError::InvalidRequest(format!(
                "count must be between 1 and {max}, got {batch_size}"
            )));
        }

        let video = self
            .store
            .find_video(key)
            .await?
            .ok_or_else(|| PipelineError::VideoNotFound(key.to_string()))?;

        self.scheduler.advance(video.id, batch_size).await
    }

    /// Processed segments for the playlist of `key`
    ///
    /// An unseen video is bootstrapped in the background and reported as
    /// an empty, open playlist.
    pub async fn playlist(self: &Arc<Self>, key: &VideoKey) -> Result<PlaylistSnapshot, PipelineError> {
        let Some(video) = self.store.find_video(key).await? else {
            self.spawn_bootstrap(key.clone());
            return Ok(PlaylistSnapshot::default());
        };

        let segments = self.store.segments(video.id).await?;
        let total = segments.len();
        let processed: Vec<Segment> = segments.into_iter().filter(Segment::is_processed).collect();
        let complete = total > 0 && processed.len() == total;

        if !complete && self.config.pipeline.advance_on_playlist {
            self.spawn_advance(video.id, self.config.pipeline.batch_size);
        }

        Ok(PlaylistSnapshot {
            segments: processed,
            complete,
        })
    }

    /// Advance a video in the background unless this process already is
    pub fn spawn_advance(self: &Arc<Self>, video: VideoId, batch_size: usize) {
        let Some(guard) = self.advancing.try_acquire(video) else {
            tracing::debug!(%video, "advance already in flight");
            return;
        };

        let pipeline = Arc::clone(self);
        let span = tracing::info_span!("background_advance", %video, batch_size);

        tokio::spawn(
            async move {
                let _guard = guard;
                if let Err(e) = pipeline.scheduler.advance(video, batch_size).await {
                    tracing::warn!(error = %e, "background advance failed");
                }
            }
            .instrument(span),
        );
    }

    /// Bootstrap a video and process its first batch in the background
    pub fn spawn_bootstrap(self: &Arc<Self>, key: VideoKey) {
        let Some(guard) = self.bootstrapping.try_acquire(key.clone()) else {
            tracing::debug!(video = %key, "bootstrap already in flight");
            return;
        };

        let pipeline = Arc::clone(self);
        let span = tracing::info_span!("background_bootstrap", video = %key);

        tokio::spawn(
            async move {
                let _guard = guard;
                match pipeline.bootstrap(&key).await {
                    Ok(outcome) => pipeline.spawn_advance(outcome.video.id, pipeline.config.pipeline.batch_size),
                    Err(e) => tracing::warn!(error = %e, "background bootstrap failed"),
                }
            }
            .instrument(span),
        );
    }
}
