use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Platform video identifier (e.g. the 11-character `YouTube` id)
///
/// Clients may send either a bare id or a full watch URL; both normalize to
/// the same key so a video is only ever bootstrapped once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoKey(String);

/// Input that is neither a recognizable watch URL nor a bare id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVideoKey(pub String);

impl fmt::Display for InvalidVideoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid video identifier: {}", self.0)
    }
}

impl std::error::Error for InvalidVideoKey {}

fn id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{6,64}$").expect("must be valid regex"))
}

impl VideoKey {
    /// Parse a bare id or a watch URL
    ///
    /// Recognized URL shapes: `watch?v=<id>`, `youtu.be/<id>`, and the
    /// `/embed/`, `/shorts/`, `/live/`, `/v/` path forms.
    pub fn parse(input: &str) -> Result<Self, InvalidVideoKey> {
        let trimmed = input.trim();

        if id_pattern().is_match(trimmed) {
            return Ok(Self(trimmed.to_owned()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("https://{trimmed}")
        };

        let url = Url::parse(&candidate).map_err(|_| InvalidVideoKey(input.to_owned()))?;

        extract_from_url(&url)
            .filter(|id| id_pattern().is_match(id))
            .map(Self)
            .ok_or_else(|| InvalidVideoKey(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn extract_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    if host == "youtu.be" {
        return url.path_segments()?.next().map(str::to_owned);
    }

    if !host.ends_with("youtube.com") && !host.ends_with("youtube-nocookie.com") {
        return None;
    }

    if let Some((_, id)) = url.query_pairs().find(|(name, _)| name == "v") {
        return Some(id.into_owned());
    }

    let mut segments = url.path_segments()?;
    match segments.next()? {
        "embed" | "shorts" | "live" | "v" => segments.next().map(str::to_owned),
        _ => None,
    }
}

impl fmt::Display for VideoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for VideoKey {
    type Err = InvalidVideoKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
