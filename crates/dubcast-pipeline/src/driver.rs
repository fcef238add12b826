use std::sync::Arc;
use std::time::{Duration, Instant};

use dubcast_config::{RetryConfig, StorageConfig};
use dubcast_core::VideoKey;
use dubcast_store::{Segment, SegmentCompletion, SegmentStore, StoreError};
use dubcast_telemetry::{KeyValue, metrics};
use media::{DurationProbe, normalize_reference, validate_duration};
use tts::Synthesizer;
use url::Url;

use crate::error::{FailureKind, StepError};

/// Audio for one segment, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub audio_url: Url,
    pub duration: f64,
}

/// Synthesis gave up on a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisFailure {
    pub kind: FailureKind,
    /// Client-safe summary; the underlying error is only logged
    pub message: String,
    pub attempts: u32,
}

/// Outcome of [`SynthesisDriver::process`] other than success
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{}", .0.message)]
    Failed(SynthesisFailure),

    /// The claim was taken over before the result could be written
    #[error("segment claim lost before completion")]
    Lost,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Synthesizes a claimed segment and persists its audio and timing
pub struct SynthesisDriver {
    synthesizer: Arc<dyn Synthesizer>,
    probe: Arc<dyn DurationProbe>,
    store: Arc<dyn SegmentStore>,
    storage: StorageConfig,
    retry: RetryConfig,
}

impl SynthesisDriver {
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        probe: Arc<dyn DurationProbe>,
        store: Arc<dyn SegmentStore>,
        storage: StorageConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            synthesizer,
            probe,
            store,
            storage,
            retry,
        }
    }

    /// Synthesize `segment` starting at `start` seconds and mark it processed
    ///
    /// The caller must hold the claim on `segment`.
    #[tracing::instrument(skip_all, fields(video = %video, segment = %segment.id, ordinal = segment.ordinal))]
    pub async fn process(&self, video: &VideoKey, segment: &Segment, start: f64) -> Result<SegmentCompletion, DriverError> {
        let segment_key = format!("{video}-{}", segment.ordinal);
        let started = Instant::now();

        let outcome = self.synthesize(&segment.transcript, &segment_key).await;

        let m = metrics::pipeline();
        metrics::record_duration(
            &m.synthesis_duration,
            started,
            &[KeyValue::new("outcome", if outcome.is_ok() { "success" } else { "failure" })],
        );

        let synthesized = match outcome {
            Ok(s) => s,
            Err(failure) => {
                m.segments_failed
                    .add(1, &[KeyValue::new("kind", failure.kind.to_string())]);
                return Err(DriverError::Failed(failure));
            }
        };

        let completion = SegmentCompletion {
            audio_url: synthesized.audio_url.to_string(),
            start_time: start,
            end_time: start + synthesized.duration,
        };

        if !self.store.complete(segment.id, &completion).await? {
            tracing::warn!("segment was taken over while synthesizing, discarding result");
            return Err(DriverError::Lost);
        }

        m.segments_synthesized.add(1, &[]);
        tracing::debug!(
            start = completion.start_time,
            end = completion.end_time,
            "segment processed"
        );

        Ok(completion)
    }

    /// Run synthesis attempts with exponential backoff
    ///
    /// Format errors end the loop immediately.
    pub async fn synthesize(&self, text: &str, segment_key: &str) -> Result<Synthesized, SynthesisFailure> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(text, segment_key).await {
                Ok(synthesized) => return Ok(synthesized),
                Err(e) if e.is_terminal() || attempt >= max_attempts => {
                    tracing::warn!(segment_key, attempt, error = %e, "synthesis failed");
                    return Err(SynthesisFailure {
                        kind: e.kind(),
                        message: e.kind().client_message().to_owned(),
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    let delay = backoff(self.retry.base_delay, attempt);
                    tracing::debug!(segment_key, attempt, ?delay, error = %e, "synthesis attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, text: &str, segment_key: &str) -> Result<Synthesized, StepError> {
        let reference = self.synthesizer.synthesize(text, segment_key).await?;
        let audio_url = normalize_reference(&reference, &self.storage).map_err(StepError::Format)?;
        let duration = self
            .probe
            .duration(&audio_url)
            .await
            .and_then(validate_duration)
            .map_err(StepError::Duration)?;

        Ok(Synthesized { audio_url, duration })
    }
}

/// Delay before retry number `attempt`: `base * 2^(attempt - 1)`
pub(crate) fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use dubcast_store::{MemoryStore, SegmentState};

    use super::*;
    use crate::testing::{FixedProbe, ScriptedSynthesizer, key, retry, storage};

    fn driver(synthesizer: &Arc<ScriptedSynthesizer>, probe: &Arc<FixedProbe>, store: &Arc<MemoryStore>) -> SynthesisDriver {
        SynthesisDriver::new(
            Arc::clone(synthesizer) as Arc<dyn Synthesizer>,
            Arc::clone(probe) as Arc<dyn DurationProbe>,
            Arc::clone(store) as Arc<dyn SegmentStore>,
            storage(),
            retry(),
        )
    }

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff(base, 1), Duration::from_secs(1));
        assert_eq!(backoff(base, 2), Duration::from_secs(2));
        assert_eq!(backoff(base, 3), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_normalizes_reference() {
        let synthesizer = Arc::new(ScriptedSynthesizer::default());
        let probe = Arc::new(FixedProbe::new(3.25));
        let store = Arc::new(MemoryStore::new());

        let out = driver(&synthesizer, &probe, &store)
            .synthesize("Xin chào.", "dQw4w9WgXcQ-0")
            .await
            .unwrap();

        assert_eq!(
            out.audio_url.as_str(),
            "https://storage.googleapis.com/voices/dQw4w9WgXcQ-0.mp3"
        );
        assert!((out.duration - 3.25).abs() < f64::EPSILON);
        assert_eq!(synthesizer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_then_succeed() {
        let synthesizer = Arc::new(ScriptedSynthesizer {
            fail_first: 2,
            ..ScriptedSynthesizer::default()
        });
        let probe = Arc::new(FixedProbe::new(1.0));
        let store = Arc::new(MemoryStore::new());

        let started = tokio::time::Instant::now();
        let out = driver(&synthesizer, &probe, &store).synthesize("text", "k-0").await;

        assert!(out.is_ok());
        assert_eq!(synthesizer.calls(), 3);
        // 1s then 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_report_synthesis_failure() {
        let synthesizer = Arc::new(ScriptedSynthesizer {
            fail_first: u32::MAX,
            ..ScriptedSynthesizer::default()
        });
        let probe = Arc::new(FixedProbe::new(1.0));
        let store = Arc::new(MemoryStore::new());

        let failure = driver(&synthesizer, &probe, &store)
            .synthesize("text", "k-0")
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Synthesis);
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.message, "speech synthesis failed");
        assert_eq!(synthesizer.calls(), 3);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_reference_shape_is_not_retried() {
        let synthesizer = Arc::new(ScriptedSynthesizer {
            malformed: true,
            ..ScriptedSynthesizer::default()
        });
        let probe = Arc::new(FixedProbe::new(1.0));
        let store = Arc::new(MemoryStore::new());

        let failure = driver(&synthesizer, &probe, &store)
            .synthesize("text", "k-0")
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Format);
        assert_eq!(failure.attempts, 1);
        assert_eq!(synthesizer.calls(), 1);
        assert_eq!(failure.message, "synthesis returned an unrecognized audio reference");
        assert!(!failure.message.contains("ftp://"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_duration_is_retried_then_reported() {
        let synthesizer = Arc::new(ScriptedSynthesizer::default());
        let probe = Arc::new(FixedProbe::new(0.0));
        let store = Arc::new(MemoryStore::new());

        let failure = driver(&synthesizer, &probe, &store)
            .synthesize("text", "k-0")
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Duration);
        assert_eq!(synthesizer.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn process_persists_timing_from_start() {
        let synthesizer = Arc::new(ScriptedSynthesizer::default());
        let probe = Arc::new(FixedProbe::new(2.5));
        let store = Arc::new(MemoryStore::new());
        let video = store.create_video(&key(), &["Một.".to_owned(), "Hai.".to_owned()]).await.unwrap();
        let segments = store.segments(video.id).await.unwrap();
        assert!(store.claim(segments[1].id, Duration::from_secs(60)).await.unwrap());

        let completion = driver(&synthesizer, &probe, &store)
            .process(&key(), &segments[1], 4.0)
            .await
            .unwrap();

        assert!((completion.end_time - 6.5).abs() < f64::EPSILON);
        let stored = store.segment(segments[1].id).await.unwrap().unwrap();
        assert_eq!(stored.state, SegmentState::Processed);
        assert!((stored.start_time - 4.0).abs() < f64::EPSILON);
        assert_eq!(
            stored.audio_url.as_deref(),
            Some("https://storage.googleapis.com/voices/dQw4w9WgXcQ-1.mp3")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn process_without_claim_is_lost() {
        let synthesizer = Arc::new(ScriptedSynthesizer::default());
        let probe = Arc::new(FixedProbe::new(2.5));
        let store = Arc::new(MemoryStore::new());
        let video = store.create_video(&key(), &["Một.".to_owned()]).await.unwrap();
        let segment = store.segments(video.id).await.unwrap().remove(0);

        let err = driver(&synthesizer, &probe, &store)
            .process(&key(), &segment, 0.0)
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::Lost));
        let stored = store.segment(segment.id).await.unwrap().unwrap();
        assert_eq!(stored.state, SegmentState::Unprocessed);
    }
}
