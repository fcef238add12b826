use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dubcast_core::VideoKey;
use serde::{Deserialize, Serialize};

/// Store-assigned video identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub u64);

/// Store-assigned segment identifier, unique across videos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SegmentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A source video and its completion marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: VideoId,
    pub key: VideoKey,
    /// Number of segments created at bootstrap
    pub total_segments: usize,
    /// Equals `total_segments` once every segment has been processed, 0 before
    pub completed_segments: usize,
    pub created_at_ms: u64,
}

impl Video {
    pub fn is_complete(&self) -> bool {
        self.total_segments > 0 && self.completed_segments >= self.total_segments
    }
}

/// Lifecycle of a segment
///
/// `Unprocessed -> Processing -> Processed` is the happy path. A failed
/// synthesis parks the segment in `Failed` until it is requeued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentState {
    Unprocessed,
    Processing,
    Processed,
    Failed,
}

impl SegmentState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unprocessed" => Some(Self::Unprocessed),
            "processing" => Some(Self::Processing),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bounded chunk of translated transcript and, once processed, its audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub video_id: VideoId,
    /// 0-based position within the video
    pub ordinal: u32,
    pub transcript: String,
    pub state: SegmentState,
    /// Seconds from the start of the dubbed track; meaningful once processed
    pub start_time: f64,
    pub end_time: f64,
    /// Canonical `https` reference to the synthesized audio
    pub audio_url: Option<String>,
    /// Number of times the segment has been claimed
    pub attempts: u32,
    pub last_error: Option<String>,
    pub claimed_at_ms: Option<u64>,
}

impl Segment {
    pub fn is_processed(&self) -> bool {
        self.state == SegmentState::Processed
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether another flow currently owns this segment
    ///
    /// A `Processing` segment whose lease has run out counts as abandoned
    /// and may be claimed again.
    pub fn is_leased(&self, lease: Duration, now_ms: u64) -> bool {
        if self.state != SegmentState::Processing {
            return false;
        }
        let claimed = self.claimed_at_ms.unwrap_or(0);
        now_ms.saturating_sub(claimed) < lease_millis(lease)
    }

    /// Whether a `claim` issued at `now_ms` would succeed
    pub fn is_claimable(&self, lease: Duration, now_ms: u64) -> bool {
        match self.state {
            SegmentState::Unprocessed => true,
            SegmentState::Processing => !self.is_leased(lease, now_ms),
            SegmentState::Processed | SegmentState::Failed => false,
        }
    }
}

/// Outcome of a successful synthesis, written atomically by `complete`
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCompletion {
    pub audio_url: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

pub(crate) fn lease_millis(lease: Duration) -> u64 {
    u64::try_from(lease.as_millis()).unwrap_or(u64::MAX)
}
