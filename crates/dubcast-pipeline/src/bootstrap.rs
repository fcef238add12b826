use std::fmt::Display;

use dubcast_config::RetryConfig;
use dubcast_core::VideoKey;
use dubcast_store::Video;
use transcript::TranscriptError;
use translation::TranslationError;

use crate::Pipeline;
use crate::chunker::chunk;
use crate::driver::backoff;
use crate::error::PipelineError;

/// A video ready for synthesis
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub video: Video,
    /// Translated transcript, as stored across the segments
    pub transcript: String,
    /// Whether this call ran the transcript import
    pub created: bool,
}

impl Pipeline {
    /// Fetch, translate and chunk a transcript into unprocessed segments
    ///
    /// Idempotent per video key: a known video is returned as is, without
    /// touching the transcript source or translator again. Transient
    /// collaborator failures are retried with the synthesis backoff policy.
    #[tracing::instrument(skip(self, key), fields(video = %key))]
    pub async fn bootstrap(&self, key: &VideoKey) -> Result<BootstrapOutcome, PipelineError> {
        if let Some(video) = self.store.find_video(key).await? {
            return self.existing(video).await;
        }

        let retry = &self.config.pipeline.retry;
        let transcript = retrying(retry, "transcript", TranscriptError::is_retryable, || {
            self.transcripts.fetch(key)
        })
        .await?;
        let translated = retrying(retry, "translation", TranslationError::is_retryable, || {
            self.translator.translate(&transcript)
        })
        .await?;
        let chunks = chunk(&translated, self.config.pipeline.chunk_max_bytes);

        if chunks.is_empty() {
            tracing::warn!("transcript produced no text to synthesize");
            return Err(PipelineError::EmptyTranscript(key.to_string()));
        }

        // Keyed on the video, so a concurrent import resolves to one video
        let video = self.store.create_video(key, &chunks).await?;

        tracing::info!(
            video_id = %video.id,
            segments = video.total_segments,
            translator = self.translator.name(),
            "video bootstrapped"
        );

        Ok(BootstrapOutcome {
            video,
            transcript: chunks.join(" "),
            created: true,
        })
    }

    async fn existing(&self, video: Video) -> Result<BootstrapOutcome, PipelineError> {
        let segments = self.store.segments(video.id).await?;
        let transcript = segments
            .iter()
            .map(|s| s.transcript.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(BootstrapOutcome {
            video,
            transcript,
            created: false,
        })
    }
}

/// Call `request` until it succeeds, fails for good, or runs out of attempts
async fn retrying<T, E, F, Fut>(
    policy: &RetryConfig,
    service: &'static str,
    retryable: fn(&E) -> bool,
    mut request: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match request().await {
            Err(e) if attempt < max_attempts && retryable(&e) => {
                let delay = backoff(policy.base_delay, attempt);
                tracing::debug!(service, attempt, ?delay, error = %e, "request failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}
