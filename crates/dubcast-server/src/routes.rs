//! HTTP handlers
//!
//! Video identifiers are accepted as bare ids or watch URLs. Every segment
//! URL handed to clients points at the delivery proxy, never at storage.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use dubcast_core::VideoKey;
use dubcast_pipeline::{
    BatchResult, Delivery, Pipeline, PipelineError, SegmentFailure, SegmentStatus, VideoStatus, playlist, proxy_url,
};
use dubcast_store::{Segment, SegmentId};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, RetryBody, retry_response};
use crate::origin::public_base;

type Result<T> = std::result::Result<T, ApiError>;

const IMMUTABLE: &str = "public, max-age=31536000, immutable";

fn video_key(raw: Option<&str>) -> Result<VideoKey> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("videoId is required".to_owned()))?;
    Ok(VideoKey::parse(raw)?)
}

fn base(pipeline: &Pipeline, headers: &HeaderMap) -> String {
    public_base(pipeline.config().server.public_base_url.as_ref(), headers)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistQuery {
    video_id: Option<String>,
}

/// Current HLS playlist of a video
pub(crate) async fn playlist(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    Query(query): Query<PlaylistQuery>,
) -> Result<Response> {
    let key = video_key(query.video_id.as_deref())?;
    let snapshot = pipeline.playlist(&key).await?;

    let base = base(&pipeline, &headers);
    let body = playlist::render(&snapshot.segments, snapshot.complete, |id| proxy_url(&base, id));

    Ok((
        [
            (header::CONTENT_TYPE, playlist::CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessRequest {
    /// Older clients send the watch URL as `url`
    #[serde(alias = "url")]
    video_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessResponse {
    video_id: VideoKey,
    transcript: String,
    total_segments: usize,
    created: bool,
}

/// Bootstrap a video: transcript, translation and segmentation
pub(crate) async fn process(
    State(pipeline): State<Arc<Pipeline>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>> {
    let key = video_key(request.video_id.as_deref())?;
    let outcome = pipeline.bootstrap(&key).await?;

    Ok(Json(ProcessResponse {
        video_id: outcome.video.key,
        transcript: outcome.transcript,
        total_segments: outcome.video.total_segments,
        created: outcome.created,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NextSegmentsRequest {
    video_id: Option<String>,
    count: Option<usize>,
    current_timestamp: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SegmentLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<SegmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ordinal: Option<u32>,
    start: f64,
    end: f64,
    url: String,
}

impl SegmentLink {
    fn full(segment: &Segment, base: &str) -> Self {
        Self {
            id: Some(segment.id),
            ordinal: Some(segment.ordinal),
            ..Self::timing(segment, base)
        }
    }

    fn timing(segment: &Segment, base: &str) -> Self {
        Self {
            id: None,
            ordinal: None,
            start: segment.start_time,
            end: segment.end_time,
            url: proxy_url(base, segment.id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NextSegmentsResponse {
    processed_count: usize,
    total_count: usize,
    available_count: usize,
    all_processed: bool,
    cursor: f64,
    segments: Vec<SegmentLink>,
    failed: Vec<SegmentFailure>,
    playlist: String,
}

/// Process the next batch, bootstrapping the video first if it is new
pub(crate) async fn next_segments(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    Json(request): Json<NextSegmentsRequest>,
) -> Result<Json<NextSegmentsResponse>> {
    let key = video_key(request.video_id.as_deref())?;
    tracing::debug!(
        video = %key,
        count = ?request.count,
        current_timestamp = ?request.current_timestamp,
        "next segments requested"
    );

    let batch = match pipeline.advance(&key, request.count).await {
        Err(PipelineError::VideoNotFound(_)) => {
            pipeline.bootstrap(&key).await?;
            pipeline.advance(&key, request.count).await?
        }
        other => other?,
    };

    let base = base(&pipeline, &headers);
    Ok(Json(batch_response(batch, &base)))
}

fn batch_response(batch: BatchResult, base: &str) -> NextSegmentsResponse {
    let playlist = playlist::render(&batch.segments, batch.all_processed, |id| proxy_url(base, id));

    NextSegmentsResponse {
        processed_count: batch.processed_count,
        total_count: batch.total_count,
        available_count: batch.segments.len(),
        all_processed: batch.all_processed,
        cursor: batch.cursor,
        segments: batch.segments.iter().map(|s| SegmentLink::full(s, base)).collect(),
        failed: batch.failed,
        playlist,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AudioProxyQuery {
    segment_id: Option<String>,
    url: Option<String>,
    #[serde(default)]
    retry: u32,
}

/// Stream a segment's audio, or defer while it is being synthesized
pub(crate) async fn audio_proxy(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    Query(query): Query<AudioProxyQuery>,
) -> Result<Response> {
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let delivery = match (query.segment_id.as_deref(), query.url.as_deref()) {
        (Some(id), _) => {
            let id: SegmentId = id
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid segmentId: {id}")))?;
            pipeline.deliver_segment(id, query.retry, range).await?
        }
        (None, Some(reference)) => pipeline.deliver_reference(reference, query.retry, range).await?,
        (None, None) => return Err(ApiError::BadRequest("segmentId or url is required".to_owned())),
    };

    Ok(match delivery {
        Delivery::Processing { retry_after } => retry_response(
            StatusCode::ACCEPTED,
            RetryBody {
                status: "processing",
                message: "segment is being processed".to_owned(),
                retry_after,
            },
            "no-store",
        ),
        Delivery::Audio(audio) => {
            let status = StatusCode::from_u16(audio.status).unwrap_or(StatusCode::OK);
            let length = audio.body.len();
            let mut response = Response::new(Body::from(audio.body));
            *response.status_mut() = status;

            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&audio.content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE));
            if let Some(value) = audio.content_range.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(header::CONTENT_RANGE, value);
            }

            response
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailableRequest {
    video_id: Option<String>,
    #[serde(default, alias = "currentTimestamp")]
    timestamp: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailableResponse {
    segments: Vec<SegmentLink>,
    buffered_ahead: f64,
    all_processed: bool,
}

/// Processed segments and how much audio is buffered past the playhead
pub(crate) async fn available(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    Json(request): Json<AvailableRequest>,
) -> Result<Json<AvailableResponse>> {
    let key = video_key(request.video_id.as_deref())?;
    let availability = pipeline.available(&key, request.timestamp).await?;

    let base = base(&pipeline, &headers);
    Ok(Json(AvailableResponse {
        segments: availability
            .segments
            .iter()
            .map(|s| SegmentLink::timing(s, &base))
            .collect(),
        buffered_ahead: availability.buffered_ahead,
        all_processed: availability.all_processed,
    }))
}

pub(crate) async fn requeue(
    State(pipeline): State<Arc<Pipeline>>,
    Path(id): Path<String>,
) -> Result<Json<SegmentStatus>> {
    let id: SegmentId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid segment id: {id}")))?;
    let segment = pipeline.requeue(id).await?;

    Ok(Json(SegmentStatus::from(&segment)))
}

pub(crate) async fn status(
    State(pipeline): State<Arc<Pipeline>>,
    Path(video): Path<String>,
) -> Result<Json<VideoStatus>> {
    let key = video_key(Some(video.as_str()))?;
    Ok(Json(pipeline.status(&key).await?))
}
