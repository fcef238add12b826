use std::time::Duration;

use dubcast_config::UploadConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{error::TtsError, http_client::http_client, types::SpeechAudio};

/// Uploads synthesized audio through the Cloud Storage JSON API
pub struct ObjectUploader {
    client: Client,
    api_base: Url,
    bucket: String,
    prefix: String,
    access_token: Option<SecretString>,
    timeout: Duration,
}

impl ObjectUploader {
    pub fn new(config: &UploadConfig, timeout: Duration) -> Self {
        Self {
            client: http_client(),
            api_base: config.api_base.clone(),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            access_token: config.access_token.clone(),
            timeout,
        }
    }

    /// Object name for a segment key and file extension
    pub fn object_name(&self, segment_key: &str, extension: &str) -> String {
        format!("{}{segment_key}.{extension}", self.prefix)
    }

    fn upload_url(&self, object: &str) -> crate::error::Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| TtsError::Config(format!("upload api_base cannot be a base URL: {}", self.api_base)))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", &self.bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);
        Ok(url)
    }

    /// Store the audio and return its `gs://` reference
    ///
    /// Uploading the same object name twice overwrites it, so a retried
    /// segment never leaves a second copy behind.
    pub async fn upload(&self, object: &str, audio: SpeechAudio) -> crate::error::Result<String> {
        let url = self.upload_url(object)?;

        let mut builder = self
            .client
            .post(url)
            .header(http::header::CONTENT_TYPE, audio.content_type)
            .timeout(self.timeout)
            .body(audio.audio);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(|e| TtsError::from_send("object storage", &e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(bucket = %self.bucket, object, status = %status, "audio upload rejected");
            return Err(TtsError::Upload(format!("storage returned {status}: {message}")));
        }

        tracing::debug!(bucket = %self.bucket, object, "audio uploaded");
        Ok(format!("gs://{}/{object}", self.bucket))
    }
}
