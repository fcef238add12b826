mod harness;

use std::time::Duration;

use harness::config::ConfigBuilder;
use harness::server::TestServer;
use harness::upstream::{MockUpstream, audio_body, sentences};
use serde_json::{Value, json};

const VIDEO: &str = "dQw4w9WgXcQ";

async fn setup(transcript: &str) -> (MockUpstream, TestServer) {
    let upstream = MockUpstream::start().await.unwrap();
    upstream.with_transcript(VIDEO, transcript);
    let config = ConfigBuilder::new(&upstream)
        .without_playlist_advance()
        .with_allowed_hosts(&["127.0.0.1"])
        .build();
    let server = TestServer::start(config).await.unwrap();
    (upstream, server)
}

async fn segment_ids(server: &TestServer) -> Vec<u64> {
    let status: Value = server
        .client()
        .get(server.url(&format!("/api/videos/{VIDEO}/status")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    status["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect()
}

async fn proxy(server: &TestServer, id: u64, retry: u32) -> reqwest::Response {
    server
        .client()
        .get(server.url("/api/audio-proxy"))
        .query(&[("segmentId", id.to_string()), ("retry", retry.to_string())])
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn unprocessed_segment_is_deferred_then_served() {
    let (upstream, server) = setup(&sentences(3)).await;
    server.post_json("/api/process", &json!({ "videoId": VIDEO })).await;
    let first = segment_ids(&server).await[0];

    let resp = proxy(&server, first, 0).await;
    assert_eq!(resp.status(), 202);
    assert_eq!(resp.headers()["retry-after"], "2");
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "processing");
    assert_eq!(body["retryAfter"], 2);

    let mut served = None;
    for _ in 0..100 {
        let resp = proxy(&server, first, 0).await;
        if resp.status() == 200 {
            served = Some(resp);
            break;
        }
        assert_eq!(resp.status(), 202);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let resp = served.expect("segment was never served");

    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(resp.headers()["accept-ranges"], "bytes");
    assert_eq!(resp.headers()["cache-control"], "public, max-age=31536000, immutable");
    let expected = audio_body(&format!("{VIDEO}-0.mp3"));
    assert_eq!(resp.headers()["content-length"], expected.len().to_string().as_str());
    assert_eq!(resp.bytes().await.unwrap().as_ref(), expected.as_slice());

    // concurrent deferrals share one synthesis
    assert_eq!(upstream.synthesize_calls(), 1);
}

#[tokio::test]
async fn range_requests_are_forwarded() {
    let (_upstream, server) = setup(&sentences(1)).await;
    server.next_segments(VIDEO, None).await;
    let id = segment_ids(&server).await[0];

    let resp = server
        .client()
        .get(server.url("/api/audio-proxy"))
        .query(&[("segmentId", id.to_string())])
        .header("range", "bytes=0-3")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    let total = audio_body(&format!("{VIDEO}-0.mp3")).len();
    assert_eq!(resp.headers()["content-range"], format!("bytes 0-3/{total}").as_str());
    assert_eq!(resp.headers()["content-length"], "4");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"ID3-");
}

#[tokio::test]
async fn origin_failures_carry_growing_retry_hints() {
    let (upstream, server) = setup(&sentences(1)).await;
    server.next_segments(VIDEO, None).await;
    let id = segment_ids(&server).await[0];
    upstream.fail_audio(10);

    let resp = proxy(&server, id, 0).await;
    assert_eq!(resp.status(), 503);
    assert_eq!(resp.headers()["retry-after"], "1");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["retryAfter"], 1);

    let resp = proxy(&server, id, 2).await;
    assert_eq!(resp.status(), 503);
    assert_eq!(resp.headers()["retry-after"], "3");

    // past the retry cap the client is told to give up
    let resp = proxy(&server, id, 3).await;
    assert_eq!(resp.status(), 502);
    assert!(resp.headers().get("retry-after").is_none());

    upstream.fail_audio(0);
    assert_eq!(proxy(&server, id, 0).await.status(), 200);
}

#[tokio::test]
async fn slow_origin_times_out() {
    let (upstream, server) = setup(&sentences(1)).await;
    server.next_segments(VIDEO, None).await;
    let id = segment_ids(&server).await[0];
    upstream.delay_audio(Duration::from_secs(2));

    let resp = proxy(&server, id, 0).await;

    assert_eq!(resp.status(), 504);
    assert_eq!(resp.headers()["retry-after"], "1");
}

#[tokio::test]
async fn failed_segment_is_a_conflict() {
    let (_upstream, server) = setup("FAIL 00.").await;
    let body: Value = server.next_segments(VIDEO, None).await.json().await.unwrap();
    let id = body["failed"][0]["id"].as_u64().unwrap();

    let resp = proxy(&server, id, 0).await;

    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn direct_references_are_limited_to_allowed_hosts() {
    let (upstream, server) = setup(&sentences(1)).await;

    let allowed = upstream.url("/audio/direct.mp3");
    let resp = server
        .client()
        .get(server.url("/api/audio-proxy"))
        .query(&[("url", allowed.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), audio_body("direct.mp3").as_slice());

    let resp = server
        .client()
        .get(server.url("/api/audio-proxy"))
        .query(&[("url", "http://attacker.example.com/secret")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert_eq!(upstream.audio_calls(), 1);
}

#[tokio::test]
async fn bad_proxy_requests_are_rejected() {
    let (_upstream, server) = setup(&sentences(1)).await;

    let resp = server.client().get(server.url("/api/audio-proxy")).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = server
        .client()
        .get(server.url("/api/audio-proxy?segmentId=abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert_eq!(proxy(&server, 424_242, 0).await.status(), 404);
}
