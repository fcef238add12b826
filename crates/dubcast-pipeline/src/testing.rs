//! Scripted collaborators for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dubcast_config::{RetryConfig, StorageConfig};
use dubcast_core::VideoKey;
use dubcast_store::{MemoryStore, SegmentStore};
use media::{DurationProbe, MediaError};
use transcript::{TranscriptError, TranscriptSource};
use translation::{NoopTranslator, TranslationError, Translator};
use tts::{Synthesizer, TtsError};
use url::Url;

use crate::Collaborators;

pub(crate) fn key() -> VideoKey {
    VideoKey::parse("dQw4w9WgXcQ").unwrap()
}

pub(crate) fn retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
    }
}

pub(crate) fn storage() -> StorageConfig {
    StorageConfig::default()
}

/// Synthesizer returning `gs://voices/{key}.mp3`
///
/// Fails every call whose text contains `fail_marker`, and the first
/// `fail_first` calls overall.
#[derive(Default)]
pub(crate) struct ScriptedSynthesizer {
    pub calls: AtomicU32,
    pub fail_first: u32,
    pub fail_marker: Option<String>,
    pub malformed: bool,
}

impl ScriptedSynthesizer {
    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str, segment_key: &str) -> tts::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;

        if call < self.fail_first || self.fail_marker.as_deref().is_some_and(|m| text.contains(m)) {
            return Err(TtsError::ProviderApi {
                status: 500,
                message: "voice model overloaded".to_owned(),
            });
        }
        if self.malformed {
            return Ok(format!("ftp://voices/{segment_key}.mp3"));
        }
        Ok(format!("gs://voices/{segment_key}.mp3"))
    }
}

/// Probe reporting a fixed duration for every URL
pub(crate) struct FixedProbe {
    pub seconds: f64,
    pub calls: AtomicU32,
}

impl FixedProbe {
    pub(crate) const fn new(seconds: f64) -> Self {
        Self {
            seconds,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn duration(&self, _url: &Url) -> media::Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.seconds > 0.0 {
            Ok(self.seconds)
        } else {
            Err(MediaError::InvalidDuration(self.seconds))
        }
    }
}

/// Transcript source serving one fixed text
pub(crate) struct FixedTranscript {
    pub text: Option<String>,
    pub calls: AtomicU32,
}

impl FixedTranscript {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn missing() -> Self {
        Self {
            text: None,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TranscriptSource for FixedTranscript {
    async fn fetch(&self, key: &VideoKey) -> transcript::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| TranscriptError::Unavailable(key.to_string()))
    }
}

/// Translator that upper-cases, so tests can see it ran
///
/// Times out on the first `timeouts` calls.
#[derive(Default)]
pub(crate) struct Shouting {
    pub timeouts: u32,
    pub calls: AtomicU32,
}

#[async_trait]
impl Translator for Shouting {
    async fn translate(&self, text: &str) -> translation::Result<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.timeouts {
            return Err(TranslationError::Timeout);
        }
        Ok(text.to_uppercase())
    }

    fn name(&self) -> &str {
        "shouting"
    }
}

/// Transcript of `n` short sentences, one chunk each at 16 bytes
pub(crate) fn sentences(n: usize) -> String {
    (0..n).map(|i| format!("Line {i:02}.")).collect::<Vec<_>>().join(" ")
}

pub(crate) struct Fakes {
    pub store: Arc<MemoryStore>,
    pub transcripts: Arc<FixedTranscript>,
    pub synthesizer: Arc<ScriptedSynthesizer>,
    pub probe: Arc<FixedProbe>,
}

impl Fakes {
    pub(crate) fn new(transcript: &str, synthesizer: ScriptedSynthesizer) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            transcripts: Arc::new(FixedTranscript::new(transcript)),
            synthesizer: Arc::new(synthesizer),
            probe: Arc::new(FixedProbe::new(2.5)),
        }
    }

    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            store: Arc::clone(&self.store) as Arc<dyn SegmentStore>,
            transcripts: Arc::clone(&self.transcripts) as Arc<dyn TranscriptSource>,
            translator: Arc::new(NoopTranslator),
            synthesizer: Arc::clone(&self.synthesizer) as Arc<dyn Synthesizer>,
            probe: Arc::clone(&self.probe) as Arc<dyn DurationProbe>,
        }
    }
}
