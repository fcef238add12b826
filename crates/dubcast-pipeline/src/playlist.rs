//! HLS event playlist rendering
//!
//! The playlist grows as segments are processed and is only terminated
//! with `#EXT-X-ENDLIST` once the whole video is dubbed. Until then players
//! keep re-fetching it.

use dubcast_store::{Segment, SegmentId};

pub const CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Target duration advertised while no segment is listed
const EMPTY_TARGET_DURATION: u64 = 10;

/// Render processed segments as an HLS playlist
///
/// Only processed segments are listed, in ordinal order. `resolve_url`
/// maps a segment to the URL players fetch it from. An empty playlist is
/// never terminated, whatever `complete` says.
pub fn render(segments: &[Segment], complete: bool, resolve_url: impl Fn(SegmentId) -> String) -> String {
    let mut listed: Vec<&Segment> = segments.iter().filter(|s| s.is_processed()).collect();
    listed.sort_by_key(|s| s.ordinal);

    let max_duration = listed.iter().map(|s| s.duration()).fold(0.0, f64::max);
    let target_duration = if listed.is_empty() {
        EMPTY_TARGET_DURATION
    } else {
        target_duration(max_duration)
    };
    let media_sequence = listed.first().map_or(0, |s| s.ordinal);

    let mut lines = vec![
        "#EXTM3U".to_owned(),
        "#EXT-X-VERSION:3".to_owned(),
        "#EXT-X-ALLOW-CACHE:NO".to_owned(),
        "#EXT-X-PLAYLIST-TYPE:EVENT".to_owned(),
        format!("#EXT-X-TARGETDURATION:{target_duration}"),
        format!("#EXT-X-MEDIA-SEQUENCE:{media_sequence}"),
    ];

    for segment in &listed {
        lines.push(format!("#EXTINF:{:.3},", segment.duration()));
        lines.push(resolve_url(segment.id));
    }

    if complete && !listed.is_empty() {
        lines.push("#EXT-X-ENDLIST".to_owned());
    }

    let mut playlist = lines.join("\n");
    playlist.push('\n');
    playlist
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn target_duration(max_duration: f64) -> u64 {
    max_duration.ceil().max(0.0) as u64 + 1
}
