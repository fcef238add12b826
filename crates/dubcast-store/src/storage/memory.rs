use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use dubcast_core::VideoKey;

use crate::model::{Segment, SegmentCompletion, SegmentId, SegmentState, Video, VideoId, now_millis};
use crate::{Result, SegmentStore};

/// Process-local store
///
/// A single lock guards all maps, so every operation is atomic. Suitable
/// for a single instance and for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_video: u64,
    next_segment: u64,
    videos: HashMap<VideoId, Video>,
    keys: HashMap<VideoKey, VideoId>,
    segments: HashMap<SegmentId, Segment>,
    order: HashMap<VideoId, Vec<SegmentId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn transition(&self, id: SegmentId, apply: impl FnOnce(&mut Segment) -> bool) -> bool {
        self.lock().segments.get_mut(&id).is_some_and(apply)
    }
}

#[async_trait]
impl SegmentStore for MemoryStore {
    async fn find_video(&self, key: &VideoKey) -> Result<Option<Video>> {
        let inner = self.lock();
        Ok(inner.keys.get(key).and_then(|id| inner.videos.get(id)).cloned())
    }

    async fn create_video(&self, key: &VideoKey, chunks: &[String]) -> Result<Video> {
        let mut inner = self.lock();

        if let Some(video) = inner.keys.get(key).and_then(|id| inner.videos.get(id)) {
            return Ok(video.clone());
        }

        inner.next_video += 1;
        let video_id = VideoId(inner.next_video);

        let mut ids = Vec::with_capacity(chunks.len());
        for (ordinal, text) in (0u32..).zip(chunks) {
            inner.next_segment += 1;
            let id = SegmentId(inner.next_segment);
            inner.segments.insert(
                id,
                Segment {
                    id,
                    video_id,
                    ordinal,
                    transcript: text.clone(),
                    state: SegmentState::Unprocessed,
                    start_time: 0.0,
                    end_time: 0.0,
                    audio_url: None,
                    attempts: 0,
                    last_error: None,
                    claimed_at_ms: None,
                },
            );
            ids.push(id);
        }

        let video = Video {
            id: video_id,
            key: key.clone(),
            total_segments: ids.len(),
            completed_segments: 0,
            created_at_ms: now_millis(),
        };

        inner.order.insert(video_id, ids);
        inner.keys.insert(key.clone(), video_id);
        inner.videos.insert(video_id, video.clone());

        Ok(video)
    }

    async fn video(&self, id: VideoId) -> Result<Option<Video>> {
        Ok(self.lock().videos.get(&id).cloned())
    }

    async fn segments(&self, video: VideoId) -> Result<Vec<Segment>> {
        let inner = self.lock();
        let Some(ids) = inner.order.get(&video) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| inner.segments.get(id)).cloned().collect())
    }

    async fn segment(&self, id: SegmentId) -> Result<Option<Segment>> {
        Ok(self.lock().segments.get(&id).cloned())
    }

    async fn count(&self, video: VideoId) -> Result<usize> {
        Ok(self.lock().order.get(&video).map_or(0, Vec::len))
    }

    async fn claim(&self, id: SegmentId, lease: Duration) -> Result<bool> {
        let now = now_millis();
        Ok(self.transition(id, |segment| {
            if !segment.is_claimable(lease, now) {
                return false;
            }
            segment.state = SegmentState::Processing;
            segment.claimed_at_ms = Some(now);
            segment.attempts += 1;
            true
        }))
    }

    async fn complete(&self, id: SegmentId, completion: &SegmentCompletion) -> Result<bool> {
        Ok(self.transition(id, |segment| {
            if segment.state != SegmentState::Processing {
                return false;
            }
            segment.state = SegmentState::Processed;
            segment.audio_url = Some(completion.audio_url.clone());
            segment.start_time = completion.start_time;
            segment.end_time = completion.end_time;
            segment.claimed_at_ms = None;
            segment.last_error = None;
            true
        }))
    }

    async fn fail(&self, id: SegmentId, message: &str) -> Result<bool> {
        Ok(self.transition(id, |segment| {
            if segment.state != SegmentState::Processing {
                return false;
            }
            segment.state = SegmentState::Failed;
            segment.last_error = Some(message.to_owned());
            segment.claimed_at_ms = None;
            true
        }))
    }

    async fn release(&self, id: SegmentId) -> Result<bool> {
        Ok(self.transition(id, |segment| {
            if segment.state != SegmentState::Processing {
                return false;
            }
            segment.state = SegmentState::Unprocessed;
            segment.claimed_at_ms = None;
            true
        }))
    }

    async fn requeue(&self, id: SegmentId) -> Result<bool> {
        Ok(self.transition(id, |segment| {
            if segment.state != SegmentState::Failed {
                return false;
            }
            segment.state = SegmentState::Unprocessed;
            true
        }))
    }

    async fn mark_complete(&self, video: VideoId, total: usize) -> Result<()> {
        if let Some(video) = self.lock().videos.get_mut(&video) {
            video.completed_segments = total;
        }
        Ok(())
    }
}
