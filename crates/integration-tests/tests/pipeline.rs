mod harness;

use harness::config::ConfigBuilder;
use harness::server::{TestServer, entries};
use harness::upstream::{MockUpstream, sentences};
use serde_json::{Value, json};

const VIDEO: &str = "dQw4w9WgXcQ";

async fn setup(transcript: &str) -> (MockUpstream, TestServer) {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.with_transcript(VIDEO, transcript);
    let config = ConfigBuilder::new(&upstream).without_playlist_advance().build();
    let server = TestServer::start(config).await.unwrap();
    (upstream, server)
}

#[tokio::test]
async fn process_bootstraps_a_video_once() {
    let (upstream, server) = setup(&sentences(12)).await;

    let resp = server.post_json("/api/process", &json!({ "videoId": VIDEO })).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["videoId"], VIDEO);
    assert_eq!(body["totalSegments"], 12);
    assert_eq!(body["created"], true);
    assert_eq!(body["transcript"], sentences(12));

    let resp = server
        .post_json("/api/process", &json!({ "url": format!("https://www.youtube.com/watch?v={VIDEO}") }))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalSegments"], 12);
    assert_eq!(body["created"], false);

    assert_eq!(upstream.transcript_calls(), 1);
    assert_eq!(upstream.synthesize_calls(), 0);
}

#[tokio::test]
async fn process_applies_translation() {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.with_transcript(VIDEO, sentences(3));
    let config = ConfigBuilder::new(&upstream).with_remote_translation(&upstream).build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server.post_json("/api/process", &json!({ "videoId": VIDEO })).await;
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["transcript"], "Dòng 00. Dòng 01. Dòng 02.");
    assert_eq!(body["totalSegments"], 3);
    assert_eq!(upstream.translate_calls(), 1);
}

#[tokio::test]
async fn process_reports_missing_transcript() {
    let (_upstream, server) = setup(&sentences(1)).await;

    let resp = server.post_json("/api/process", &json!({ "videoId": "aaaaaaaaaaa" })).await;
    assert_eq!(resp.status(), 404);

    let resp = server.post_json("/api/process", &json!({})).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn blank_transcript_is_unavailable() {
    let (_upstream, server) = setup("   ").await;

    let resp = server.post_json("/api/process", &json!({ "videoId": VIDEO })).await;

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn batches_advance_through_the_whole_video() {
    let (upstream, server) = setup(&sentences(12)).await;

    // unseen videos are bootstrapped on demand
    let first: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(first["processedCount"], 5);
    assert_eq!(first["availableCount"], 5);
    assert_eq!(first["totalCount"], 12);
    assert_eq!(first["allProcessed"], false);
    assert_eq!(first["cursor"], 10.0);
    assert_eq!(first["failed"], json!([]));

    let segments = first["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 5);
    assert_eq!(segments[0]["ordinal"], 0);
    assert_eq!(segments[0]["start"], 0.0);
    assert_eq!(segments[0]["end"], 2.0);
    assert_eq!(segments[4]["start"], 8.0);
    assert!(
        segments[0]["url"]
            .as_str()
            .unwrap()
            .contains("/api/audio-proxy?segmentId=")
    );

    let playlist = first["playlist"].as_str().unwrap();
    assert_eq!(entries(playlist), 5);
    assert!(!playlist.contains("#EXT-X-ENDLIST"));

    let second: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(second["processedCount"], 5);
    assert_eq!(second["availableCount"], 10);
    assert_eq!(second["allProcessed"], false);

    let third: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(third["processedCount"], 2);
    assert_eq!(third["availableCount"], 12);
    assert_eq!(third["allProcessed"], true);
    assert_eq!(third["cursor"], 24.0);
    assert!(third["playlist"].as_str().unwrap().contains("#EXT-X-ENDLIST"));

    assert_eq!(upstream.synthesize_calls(), 12);
    assert_eq!(upstream.probe_calls(), 12);
}

#[tokio::test]
async fn finished_video_is_not_synthesized_again() {
    let (upstream, server) = setup(&sentences(3)).await;

    let done: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(done["allProcessed"], true);

    let again: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(again["processedCount"], 0);
    assert_eq!(again["availableCount"], 3);
    assert_eq!(again["allProcessed"], true);

    assert_eq!(upstream.synthesize_calls(), 3);
}

#[tokio::test]
async fn count_overrides_and_is_bounded() {
    let (_upstream, server) = setup(&sentences(12)).await;

    let body: Value = server.next_segments(VIDEO, Some(2)).await.json().await.unwrap();
    assert_eq!(body["processedCount"], 2);

    assert_eq!(server.next_segments(VIDEO, Some(0)).await.status(), 400);
    assert_eq!(server.next_segments(VIDEO, Some(51)).await.status(), 400);
}

#[tokio::test]
async fn failed_segment_is_parked_until_requeued() {
    let (upstream, server) = setup("Line 00. Line 01. FAIL 02. Line 03.").await;

    let body: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(body["processedCount"], 3);
    assert_eq!(body["allProcessed"], false);

    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["ordinal"], 2);
    assert_eq!(failed[0]["kind"], "synthesis");
    let failed_id = failed[0]["id"].as_u64().unwrap();

    // three attempts for the failing segment, one for each of the others
    assert_eq!(upstream.synthesize_calls(), 6);

    let again: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(again["processedCount"], 0);
    assert_eq!(again["failed"], json!([]));
    assert_eq!(upstream.synthesize_calls(), 6);

    let status: Value = server
        .client()
        .get(server.url(&format!("/api/videos/{VIDEO}/status")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["failed"], 1);
    assert_eq!(status["segments"][2]["state"], "failed");
    // one claim, retried in place by the driver
    assert_eq!(status["segments"][2]["attempts"], 1);
    assert_eq!(status["segments"][2]["lastError"], "speech synthesis failed");

    upstream.heal_synthesis();

    let requeue_url = server.url(&format!("/api/segments/{failed_id}/requeue"));
    let resp = server.client().post(&requeue_url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let segment: Value = resp.json().await.unwrap();
    assert_eq!(segment["state"], "unprocessed");

    let resp = server.client().post(&requeue_url).send().await.unwrap();
    assert_eq!(resp.status(), 409);

    let done: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    assert_eq!(done["processedCount"], 1);
    assert_eq!(done["availableCount"], 4);
    assert_eq!(done["allProcessed"], true);
}

#[tokio::test]
async fn requeue_of_unknown_segment_is_not_found() {
    let (_upstream, server) = setup(&sentences(1)).await;

    let resp = server
        .client()
        .post(server.url("/api/segments/999/requeue"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn status_summarizes_progress() {
    let (_upstream, server) = setup(&sentences(12)).await;
    server.next_segments(VIDEO, None).await;

    let resp = server
        .client()
        .get(server.url(&format!("/api/videos/{VIDEO}/status")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let status: Value = resp.json().await.unwrap();
    assert_eq!(status["videoId"], VIDEO);
    assert_eq!(status["total"], 12);
    assert_eq!(status["processed"], 5);
    assert_eq!(status["unprocessed"], 7);
    assert_eq!(status["failed"], 0);
    assert_eq!(status["complete"], false);
    assert_eq!(status["segments"].as_array().unwrap().len(), 12);
    assert_eq!(status["segments"][0]["state"], "processed");
    assert_eq!(status["segments"][11]["state"], "unprocessed");

    let resp = server
        .client()
        .get(server.url("/api/videos/bbbbbbbbbbb/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn availability_reports_buffered_audio() {
    let (_upstream, server) = setup(&sentences(12)).await;
    server.next_segments(VIDEO, None).await;

    let resp = server
        .post_json("/api/segments/available", &json!({ "videoId": VIDEO, "timestamp": 3.0 }))
        .await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["segments"].as_array().unwrap().len(), 5);
    assert_eq!(body["bufferedAhead"], 7.0);
    assert_eq!(body["allProcessed"], false);
    assert!(body["segments"][0].get("id").is_none());

    let resp = server
        .post_json("/api/segments/available", &json!({ "videoId": VIDEO, "timestamp": -1.0 }))
        .await;
    assert_eq!(resp.status(), 400);
}
