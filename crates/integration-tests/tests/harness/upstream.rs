//! Mock collaborator services for integration tests
//!
//! One axum server stands in for the transcript service, the translation
//! function, the synthesis function, the audio-length probe and the audio
//! origin. Every endpoint counts its calls so tests can assert on how much
//! work the pipeline actually did.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Synthesis requests whose text contains this marker fail
pub const FAIL_MARKER: &str = "FAIL";

/// Duration reported by the probe for every segment
pub const SEGMENT_SECONDS: f64 = 2.0;

#[derive(Default)]
struct UpstreamState {
    addr: Option<SocketAddr>,
    transcripts: Mutex<HashMap<String, String>>,
    transcript_calls: AtomicU32,
    translate_calls: AtomicU32,
    synthesize_calls: AtomicU32,
    probe_calls: AtomicU32,
    audio_calls: AtomicU32,
    audio_failures: AtomicU32,
    audio_delay_ms: AtomicU64,
    synthesis_healed: AtomicBool,
}

/// A running mock upstream
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<UpstreamState>,
    shutdown: CancellationToken,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(UpstreamState {
            addr: Some(addr),
            ..UpstreamState::default()
        });

        let app = Router::new()
            .route("/transcript", get(transcript))
            .route("/translate", post(translate))
            .route("/synthesize", post(synthesize))
            .route("/audio-length", post(audio_length))
            .route("/audio/{name}", get(audio))
            .with_state(state.clone());

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .ok();
        });

        Ok(Self { addr, state, shutdown })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve `text` as the transcript of `video`
    pub fn with_transcript(&self, video: &str, text: impl Into<String>) -> &Self {
        self.state
            .transcripts
            .lock()
            .unwrap()
            .insert(video.to_owned(), text.into());
        self
    }

    /// Stop failing synthesis for texts carrying [`FAIL_MARKER`]
    pub fn heal_synthesis(&self) {
        self.state.synthesis_healed.store(true, Ordering::SeqCst);
    }

    /// Fail the next `count` audio requests with a 500
    pub fn fail_audio(&self, count: u32) {
        self.state.audio_failures.store(count, Ordering::SeqCst);
    }

    /// Delay every audio response
    pub fn delay_audio(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.audio_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn transcript_calls(&self) -> u32 {
        self.state.transcript_calls.load(Ordering::SeqCst)
    }

    pub fn translate_calls(&self) -> u32 {
        self.state.translate_calls.load(Ordering::SeqCst)
    }

    pub fn synthesize_calls(&self) -> u32 {
        self.state.synthesize_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> u32 {
        self.state.probe_calls.load(Ordering::SeqCst)
    }

    pub fn audio_calls(&self) -> u32 {
        self.state.audio_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// `count` one-segment sentences at a 16-byte chunk limit
pub fn sentences(count: usize) -> String {
    (0..count).map(|i| format!("Line {i:02}.")).collect::<Vec<_>>().join(" ")
}

/// Audio bytes served for `name`
pub fn audio_body(name: &str) -> Vec<u8> {
    format!("ID3-dubbed-audio-{name}").into_bytes()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptQuery {
    video_id: String,
}

async fn transcript(State(state): State<Arc<UpstreamState>>, Query(query): Query<TranscriptQuery>) -> Response {
    state.transcript_calls.fetch_add(1, Ordering::SeqCst);

    let text = state.transcripts.lock().unwrap().get(&query.video_id).cloned();
    match text {
        Some(transcript) => Json(serde_json::json!({ "transcript": transcript })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "no captions" }))).into_response(),
    }
}

#[derive(Deserialize)]
struct TranslateRequest {
    transcripts: String,
}

async fn translate(State(state): State<Arc<UpstreamState>>, Json(body): Json<TranslateRequest>) -> Json<serde_json::Value> {
    state.translate_calls.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "processed_transcript": body.transcripts.replace("Line", "Dòng") }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest {
    text: String,
    segment_id: String,
}

async fn synthesize(State(state): State<Arc<UpstreamState>>, Json(body): Json<SynthesizeRequest>) -> Response {
    state.synthesize_calls.fetch_add(1, Ordering::SeqCst);

    if body.text.contains(FAIL_MARKER) && !state.synthesis_healed.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "voice model overloaded" })),
        )
            .into_response();
    }

    let addr = state.addr.unwrap();
    let audio_url = format!("http://{addr}/audio/{}.mp3", body.segment_id);
    Json(serde_json::json!({ "audioUrl": audio_url })).into_response()
}

async fn audio_length(State(state): State<Arc<UpstreamState>>) -> Json<serde_json::Value> {
    state.probe_calls.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "duration": SEGMENT_SECONDS }))
}

async fn audio(State(state): State<Arc<UpstreamState>>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    state.audio_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.audio_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let failing = state
        .audio_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let body = audio_body(&name);
    let total = body.len();

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, total));

    match range {
        Some((start, end)) => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, "audio/mpeg".to_owned()),
                (header::CONTENT_RANGE, format!("bytes {start}-{end}/{total}")),
            ],
            body[start..=end].to_vec(),
        )
            .into_response(),
        None => ([(header::CONTENT_TYPE, "audio/mpeg")], body).into_response(),
    }
}

/// Parse a single `bytes=a-b` or `bytes=a-` range
fn parse_range(value: &str, total: usize) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end = if end.is_empty() { total - 1 } else { end.parse::<usize>().ok()?.min(total - 1) };
    (start <= end).then_some((start, end))
}
