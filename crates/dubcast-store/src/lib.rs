//! Persistence for videos and their dubbed segments
//!
//! Every state change on a segment is a conditional transition: it only
//! applies when the segment is in the expected source state, and reports
//! whether it did. Concurrent flows rely on that to never synthesize the
//! same segment twice or overwrite a finished one.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod model;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dubcast_config::StoreConfig;
use dubcast_core::VideoKey;

pub use error::{Result, StoreError};
pub use model::{Segment, SegmentCompletion, SegmentId, SegmentState, Video, VideoId, now_millis};
pub use storage::{MemoryStore, RedisStore};

/// Storage contract shared by every backend
#[async_trait]
pub trait SegmentStore: Send + Sync {
    async fn find_video(&self, key: &VideoKey) -> Result<Option<Video>>;

    /// Create a video with one unprocessed segment per chunk
    ///
    /// Atomic with respect to `key`: when the key already exists the
    /// existing video is returned and `chunks` are ignored.
    async fn create_video(&self, key: &VideoKey, chunks: &[String]) -> Result<Video>;

    async fn video(&self, id: VideoId) -> Result<Option<Video>>;

    /// All segments of a video in ordinal order
    async fn segments(&self, video: VideoId) -> Result<Vec<Segment>>;

    /// Unprocessed segments of a video in ordinal order
    async fn unprocessed(&self, video: VideoId) -> Result<Vec<Segment>> {
        let segments = self.segments(video).await?;
        Ok(segments
            .into_iter()
            .filter(|s| s.state == SegmentState::Unprocessed)
            .collect())
    }

    async fn segment(&self, id: SegmentId) -> Result<Option<Segment>>;

    async fn count(&self, video: VideoId) -> Result<usize>;

    /// `Unprocessed` (or `Processing` past its lease) to `Processing`
    async fn claim(&self, id: SegmentId, lease: Duration) -> Result<bool>;

    /// `Processing` to `Processed`, writing audio reference and timing together
    async fn complete(&self, id: SegmentId, completion: &SegmentCompletion) -> Result<bool>;

    /// `Processing` to `Failed`
    async fn fail(&self, id: SegmentId, message: &str) -> Result<bool>;

    /// `Processing` back to `Unprocessed`
    async fn release(&self, id: SegmentId) -> Result<bool>;

    /// `Failed` back to `Unprocessed`
    async fn requeue(&self, id: SegmentId) -> Result<bool>;

    /// Record that all `total` segments of the video are processed
    async fn mark_complete(&self, video: VideoId, total: usize) -> Result<()>;
}

/// Build the configured store backend
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn SegmentStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::debug!("using in-memory segment store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::Redis { url, key_prefix } => {
            tracing::debug!(key_prefix, "using redis segment store");
            Ok(Arc::new(RedisStore::new(url, key_prefix)?))
        }
    }
}
