//! Test server wrapper that starts dubcast on a random port

use std::net::SocketAddr;
use std::time::Duration;

use dubcast_config::Config;
use dubcast_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(config)?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn playlist(&self, video: &str) -> reqwest::Response {
        self.client
            .get(self.url("/api/playlist"))
            .query(&[("videoId", video)])
            .send()
            .await
            .unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(body).send().await.unwrap()
    }

    pub async fn next_segments(&self, video: &str, count: Option<usize>) -> reqwest::Response {
        let mut body = serde_json::json!({ "videoId": video, "currentTimestamp": 0.0 });
        if let Some(count) = count {
            body["count"] = count.into();
        }
        self.post_json("/api/process/next-segments", &body).await
    }

    /// Poll the playlist until `done` accepts it
    pub async fn wait_for_playlist(&self, video: &str, done: impl Fn(&str) -> bool) -> String {
        for _ in 0..100 {
            let playlist = self.playlist(video).await.text().await.unwrap();
            if done(&playlist) {
                return playlist;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("playlist for {video} never reached the expected state");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Number of segments listed in a playlist
pub fn entries(playlist: &str) -> usize {
    playlist.lines().filter(|l| l.starts_with("#EXTINF:")).count()
}
