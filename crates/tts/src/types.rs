/// Input for a speech provider
#[derive(Debug, Clone)]
pub struct SpeechRequest<'a> {
    /// Provider model (e.g. "tts-1" or "`eleven_multilingual_v2`")
    pub model: &'a str,
    /// Text to synthesize
    pub input: &'a str,
    /// Voice identifier (e.g. "alloy" or an `ElevenLabs` voice ID)
    pub voice: &'a str,
    /// Output audio format (mp3, opus, aac, flac, wav)
    pub response_format: &'a str,
    /// Speech speed multiplier (0.25 to 4.0)
    pub speed: Option<f64>,
}

/// Raw audio returned by a speech provider
pub struct SpeechAudio {
    pub audio: bytes::Bytes,
    /// Content type of the audio (e.g. "audio/mpeg")
    pub content_type: String,
}
