use async_trait::async_trait;
use dubcast_config::TranslationConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, TranslationError, Translator};

/// Preprocessing function that translates a whole transcript in one call
///
/// `POST {"transcripts": "<text>"}` answered by `{"processed_transcript": "<text>"}`.
pub struct RemoteTranslator {
    client: Client,
    url: Url,
    api_key: Option<SecretString>,
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    transcripts: &'a str,
}

#[derive(Deserialize)]
struct RemoteResponse {
    processed_transcript: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let url = config
            .base_url
            .clone()
            .ok_or_else(|| TranslationError::Config("translation.base_url is not set".to_owned()))?;

        Ok(Self {
            client: crate::http_client(config)?,
            url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Translator for RemoteTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let mut builder = self.client.post(self.url.clone()).json(&RemoteRequest { transcripts: text });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| TranslationError::from_send(self.name(), &e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: RemoteResponse = response.json().await.map_err(|e| TranslationError::from_body(&e))?;
        extract(body)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

fn extract(body: RemoteResponse) -> Result<String> {
    match (body.processed_transcript, body.error) {
        (Some(text), _) if !text.trim().is_empty() => Ok(text),
        (_, Some(error)) => Err(TranslationError::InvalidResponse(error)),
        _ => Err(TranslationError::InvalidResponse("missing processed_transcript".to_owned())),
    }
}
