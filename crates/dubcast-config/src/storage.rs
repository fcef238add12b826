use serde::Deserialize;
use url::Url;

/// Object storage addressing used to turn `gs://` references into fetchable URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Public origin that serves `gs://<bucket>/<object>` as `<public_base>/<bucket>/<object>`
    #[serde(default = "default_public_base")]
    pub public_base: Url,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_base: default_public_base(),
        }
    }
}

fn default_public_base() -> Url {
    Url::parse("https://storage.googleapis.com").expect("valid default URL")
}
