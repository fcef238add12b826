//! Batch selection and the timing cursor
//!
//! The cursor is recomputed from persisted state on every call, so any
//! number of instances can advance the same video. Segment claims keep two
//! flows from synthesizing the same segment, and a flow stops walking as
//! soon as it meets a segment another flow holds under a live lease.

use std::sync::Arc;
use std::time::Duration;

use dubcast_store::{Segment, SegmentId, SegmentState, SegmentStore, Video, VideoId, now_millis};
use serde::Serialize;

use crate::driver::{DriverError, SynthesisDriver};
use crate::error::{FailureKind, PipelineError};

/// A segment the batch could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFailure {
    pub id: SegmentId,
    pub ordinal: u32,
    pub kind: FailureKind,
    pub error: String,
}

/// Outcome of one [`Scheduler::advance`] call
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Segments processed by this call
    pub processed_count: usize,
    pub total_count: usize,
    pub all_processed: bool,
    /// Every processed segment of the video, in ordinal order
    pub segments: Vec<Segment>,
    pub failed: Vec<SegmentFailure>,
    /// End of the dubbed timeline after this call, in seconds
    pub cursor: f64,
}

pub struct Scheduler {
    store: Arc<dyn SegmentStore>,
    driver: SynthesisDriver,
    lease: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn SegmentStore>, driver: SynthesisDriver, lease: Duration) -> Self {
        Self { store, driver, lease }
    }

    /// Process up to `batch_size` of the next unprocessed segments
    ///
    /// Segments run one after another; each starts where the previous one
    /// ended. A failed segment is parked and the batch moves on to the next.
    /// Losing a claim to another flow ends the batch.
    #[tracing::instrument(skip(self), fields(video_key = tracing::field::Empty))]
    pub async fn advance(&self, video_id: VideoId, batch_size: usize) -> Result<BatchResult, PipelineError> {
        if batch_size == 0 {
            return Err(PipelineError::InvalidRequest("batch size must be at least 1".to_owned()));
        }

        let video = self
            .store
            .video(video_id)
            .await?
            .ok_or_else(|| PipelineError::VideoNotFound(video_id.to_string()))?;
        tracing::Span::current().record("video_key", video.key.as_str());

        let segments = self.store.segments(video.id).await?;
        let mut cursor = cursor(&segments);
        let batch = select(&segments, batch_size, self.lease, now_millis());

        let mut processed_count = 0;
        let mut failed = Vec::new();

        for segment in batch {
            if !self.store.claim(segment.id, self.lease).await? {
                tracing::debug!(segment = %segment.id, "segment claimed elsewhere, ending batch");
                break;
            }

            match self.driver.process(&video.key, segment, cursor).await {
                Ok(completion) => {
                    cursor = completion.end_time;
                    processed_count += 1;
                }
                Err(DriverError::Failed(failure)) => {
                    if !self.store.fail(segment.id, &failure.message).await? {
                        tracing::debug!(segment = %segment.id, "segment settled elsewhere, ending batch");
                        break;
                    }
                    failed.push(SegmentFailure {
                        id: segment.id,
                        ordinal: segment.ordinal,
                        kind: failure.kind,
                        error: failure.message,
                    });
                }
                // The cursor no longer follows the persisted timeline
                Err(DriverError::Lost) => {
                    failed.push(SegmentFailure {
                        id: segment.id,
                        ordinal: segment.ordinal,
                        kind: FailureKind::Conflict,
                        error: FailureKind::Conflict.client_message().to_owned(),
                    });
                    break;
                }
                Err(DriverError::Store(e)) => {
                    if let Err(release) = self.store.release(segment.id).await {
                        tracing::warn!(segment = %segment.id, error = %release, "failed to release segment claim");
                    }
                    return Err(e.into());
                }
            }
        }

        self.summarize(&video, processed_count, failed).await
    }

    async fn summarize(
        &self,
        video: &Video,
        processed_count: usize,
        failed: Vec<SegmentFailure>,
    ) -> Result<BatchResult, PipelineError> {
        let segments = self.store.segments(video.id).await?;
        let total_count = segments.len();
        let processed: Vec<Segment> = segments.into_iter().filter(Segment::is_processed).collect();
        let all_processed = total_count > 0 && processed.len() == total_count;

        if all_processed && !video.is_complete() {
            self.store.mark_complete(video.id, total_count).await?;
            tracing::info!(total = total_count, "all segments processed");
        }

        if processed_count > 0 || !failed.is_empty() {
            tracing::info!(
                processed = processed_count,
                failed = failed.len(),
                ready = processed.len(),
                total = total_count,
                "batch finished"
            );
        }

        Ok(BatchResult {
            processed_count,
            total_count,
            all_processed,
            cursor: cursor(&processed),
            segments: processed,
            failed,
        })
    }
}

/// End of the dubbed timeline: the latest end time among processed segments
pub(crate) fn cursor(segments: &[Segment]) -> f64 {
    segments
        .iter()
        .filter(|s| s.is_processed())
        .map(|s| s.end_time)
        .fold(0.0, f64::max)
}

/// Next segments to synthesize, in ordinal order
///
/// Stops at the first segment held under a live lease.
pub(crate) fn select(segments: &[Segment], batch_size: usize, lease: Duration, now_ms: u64) -> Vec<&Segment> {
    let mut batch = Vec::with_capacity(batch_size.min(segments.len()));

    for segment in segments {
        if batch.len() >= batch_size {
            break;
        }
        match segment.state {
            SegmentState::Processed | SegmentState::Failed => {}
            SegmentState::Processing if segment.is_leased(lease, now_ms) => break,
            SegmentState::Unprocessed | SegmentState::Processing => batch.push(segment),
        }
    }

    batch
}
