use std::time::Duration;

use serde::Deserialize;

/// CORS configuration
///
/// Players fetch playlists and segments cross-origin and issue range
/// requests, so the defaults allow any origin and expose the range headers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins (wildcard "*" or explicit list)
    #[serde(default)]
    pub origins: AnyOrArray,
    /// Allowed HTTP methods (wildcard "*" or explicit list)
    #[serde(default = "default_methods")]
    pub methods: AnyOrArray,
    /// Allowed request headers (wildcard "*" or explicit list)
    #[serde(default = "default_headers")]
    pub headers: AnyOrArray,
    /// Headers to expose to the browser
    #[serde(default = "default_expose_headers")]
    pub expose_headers: Vec<String>,
    /// Max age for preflight cache in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: AnyOrArray::Any,
            methods: default_methods(),
            headers: default_headers(),
            expose_headers: default_expose_headers(),
            max_age: None,
        }
    }
}

impl CorsConfig {
    /// Preflight cache lifetime, if configured
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

/// Either a wildcard "*" or explicit list of values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnyOrArray {
    /// Match any value
    #[default]
    Any,
    /// Explicit list
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for AnyOrArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Single(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Single(value) if value == "*" => Ok(Self::Any),
            Raw::Single(value) => Ok(Self::List(vec![value])),
            Raw::List(values) if values.iter().any(|v| v == "*") => Ok(Self::Any),
            Raw::List(values) => Ok(Self::List(values)),
        }
    }
}

fn default_methods() -> AnyOrArray {
    AnyOrArray::List(vec!["GET".to_owned(), "POST".to_owned(), "OPTIONS".to_owned()])
}

fn default_headers() -> AnyOrArray {
    AnyOrArray::List(vec!["content-type".to_owned(), "range".to_owned()])
}

fn default_expose_headers() -> Vec<String> {
    vec![
        "content-range".to_owned(),
        "content-length".to_owned(),
        "retry-after".to_owned(),
    ]
}
