use std::time::Duration;

use bytes::Bytes;
use http::header;
use url::Url;

use crate::{MediaError, Result};

/// Segment audio as returned by the origin
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    /// 200, or 206 when a range was honoured
    pub status: u16,
    pub content_type: String,
    pub content_range: Option<String>,
    pub body: Bytes,
}

/// Fetches segment audio from its origin with a bounded deadline
#[derive(Clone)]
pub struct AudioFetcher {
    client: reqwest::Client,
}

impl AudioFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch the whole object, or the client's `Range` of it
    pub async fn fetch(&self, url: &Url, range: Option<&str>) -> Result<FetchedAudio> {
        let mut builder = self.client.get(url.clone());
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }

        let response = builder.send().await.map_err(|e| classify(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "audio origin returned error");
            return Err(MediaError::Upstream { status: status.as_u16() });
        }

        let headers = response.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_owned();
        let content_range = headers
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response.bytes().await.map_err(|e| classify(url, &e))?;

        Ok(FetchedAudio {
            status: status.as_u16(),
            content_type,
            content_range,
            body,
        })
    }
}

fn classify(url: &Url, e: &reqwest::Error) -> MediaError {
    if e.is_timeout() {
        tracing::warn!(url = %url, "audio fetch timed out");
        MediaError::FetchTimeout
    } else {
        tracing::warn!(url = %url, error = %e, "audio fetch failed");
        MediaError::Connection(e.to_string())
    }
}
