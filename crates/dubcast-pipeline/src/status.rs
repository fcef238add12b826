use dubcast_core::VideoKey;
use dubcast_store::{Segment, SegmentId, SegmentState};
use serde::Serialize;

use crate::Pipeline;
use crate::error::PipelineError;
use crate::scheduler::cursor;

/// Processed segments around a playback position
#[derive(Debug, Clone)]
pub struct Availability {
    /// Processed segments in ordinal order
    pub segments: Vec<Segment>,
    /// Seconds of dubbed audio ready beyond the playback position
    pub buffered_ahead: f64,
    pub all_processed: bool,
}

/// Per-video progress summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub video_id: VideoKey,
    pub total: usize,
    pub processed: usize,
    pub processing: usize,
    pub unprocessed: usize,
    pub failed: usize,
    pub complete: bool,
    /// Seconds of dubbed audio available
    pub duration: f64,
    pub segments: Vec<SegmentStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStatus {
    pub id: SegmentId,
    pub ordinal: u32,
    pub state: SegmentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<&Segment> for SegmentStatus {
    fn from(segment: &Segment) -> Self {
        let processed = segment.is_processed();
        Self {
            id: segment.id,
            ordinal: segment.ordinal,
            state: segment.state,
            start: processed.then_some(segment.start_time),
            end: processed.then_some(segment.end_time),
            attempts: segment.attempts,
            last_error: segment.last_error.clone(),
        }
    }
}

impl Pipeline {
    /// Processed segments and how far they reach past `timestamp`
    pub async fn available(&self, key: &VideoKey, timestamp: f64) -> Result<Availability, PipelineError> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(PipelineError::InvalidRequest(format!(
                "timestamp must be a non-negative number of seconds, got {timestamp}"
            )));
        }

        let video = self
            .store
            .find_video(key)
            .await?
            .ok_or_else(|| PipelineError::VideoNotFound(key.to_string()))?;

        let segments = self.store.segments(video.id).await?;
        let total = segments.len();
        let processed: Vec<Segment> = segments.into_iter().filter(Segment::is_processed).collect();
        let buffered_ahead = (cursor(&processed) - timestamp).max(0.0);

        Ok(Availability {
            all_processed: total > 0 && processed.len() == total,
            segments: processed,
            buffered_ahead,
        })
    }

    pub async fn status(&self, key: &VideoKey) -> Result<VideoStatus, PipelineError> {
        let video = self
            .store
            .find_video(key)
            .await?
            .ok_or_else(|| PipelineError::VideoNotFound(key.to_string()))?;
        let segments = self.store.segments(video.id).await?;

        let count = |state: SegmentState| segments.iter().filter(|s| s.state == state).count();

        Ok(VideoStatus {
            video_id: video.key.clone(),
            total: segments.len(),
            processed: count(SegmentState::Processed),
            processing: count(SegmentState::Processing),
            unprocessed: count(SegmentState::Unprocessed),
            failed: count(SegmentState::Failed),
            complete: video.is_complete(),
            duration: cursor(&segments),
            segments: segments.iter().map(SegmentStatus::from).collect(),
        })
    }

    /// Put a failed segment back in line for the next advance
    ///
    /// The segment gets the timeline position current when it is processed,
    /// which is the end of the track if later segments finished meanwhile.
    #[tracing::instrument(skip(self))]
    pub async fn requeue(&self, id: SegmentId) -> Result<Segment, PipelineError> {
        let segment = self.store.segment(id).await?.ok_or(PipelineError::SegmentNotFound(id))?;

        if !self.store.requeue(id).await? {
            return Err(PipelineError::Conflict(format!(
                "segment {id} is {}, only failed segments can be requeued",
                segment.state
            )));
        }

        tracing::info!(video_id = %segment.video_id, ordinal = segment.ordinal, "segment requeued");
        self.store.segment(id).await?.ok_or(PipelineError::SegmentNotFound(id))
    }
}
