use async_trait::async_trait;
use dubcast_config::TranscriptConfig;
use dubcast_core::VideoKey;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::{Result, TranscriptError, TranscriptSource};

/// Transcript service client
pub struct HttpTranscriptSource {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    language: String,
}

/// Either the joined text or the caption items it is joined from
#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptBody {
    Text { transcript: String },
    Items { transcript: Vec<CaptionItem> },
}

#[derive(Deserialize)]
struct CaptionItem {
    text: String,
}

impl TranscriptBody {
    fn into_text(self) -> String {
        match self {
            Self::Text { transcript } => transcript,
            Self::Items { transcript } => transcript
                .into_iter()
                .map(|item| item.text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl HttpTranscriptSource {
    pub fn new(config: &TranscriptConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| TranscriptError::Config("transcript.base_url is not set".to_owned()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranscriptError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    fn request_url(&self, video: &VideoKey) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("videoId", video.as_str())
            .append_pair("lang", &self.language);
        url
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    async fn fetch(&self, video: &VideoKey) -> Result<String> {
        let mut builder = self.client.get(self.request_url(video));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TranscriptError::Timeout
            } else {
                tracing::error!(video = %video, error = %e, "transcript request failed");
                TranscriptError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TranscriptError::Unavailable(video.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(video = %video, status = %status, "transcript service returned error");
            return Err(TranscriptError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: TranscriptBody = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TranscriptError::Timeout
            } else {
                TranscriptError::InvalidResponse(e.to_string())
            }
        })?;

        let text = body.into_text();
        if text.trim().is_empty() {
            return Err(TranscriptError::Unavailable(video.to_string()));
        }

        tracing::debug!(video = %video, bytes = text.len(), "transcript fetched");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpTranscriptSource {
        let config = TranscriptConfig {
            base_url: Some(Url::parse("http://transcripts.internal/transcript?source=captions").unwrap()),
            ..TranscriptConfig::default()
        };
        HttpTranscriptSource::new(&config).unwrap()
    }

    #[test]
    fn request_url_keeps_existing_query() {
        let key = VideoKey::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            source().request_url(&key).as_str(),
            "http://transcripts.internal/transcript?source=captions&videoId=dQw4w9WgXcQ&lang=en"
        );
    }

    #[test]
    fn accepts_joined_text() {
        let body: TranscriptBody = serde_json::from_str(r#"{"transcript":"hello there. general kenobi"}"#).unwrap();
        assert_eq!(body.into_text(), "hello there. general kenobi");
    }

    #[test]
    fn joins_caption_items_with_spaces() {
        let body: TranscriptBody =
            serde_json::from_str(r#"{"transcript":[{"text":"hello there.","offset":0},{"text":"general kenobi"}]}"#)
                .unwrap();
        assert_eq!(body.into_text(), "hello there. general kenobi");
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let err = HttpTranscriptSource::new(&TranscriptConfig::default()).err().unwrap();
        assert!(matches!(err, TranscriptError::Config(_)));
    }
}
