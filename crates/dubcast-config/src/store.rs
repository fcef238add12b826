use serde::Deserialize;

/// Segment store backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StoreConfig {
    /// Process-local store (single instance, lost on restart)
    #[default]
    Memory,
    /// Redis/Valkey-backed store shared by every instance
    Redis {
        /// Connection URL (e.g. `redis://localhost:6379`)
        url: String,
        /// Prefix for every key written by dubcast
        #[serde(default = "default_key_prefix")]
        key_prefix: String,
    },
}

fn default_key_prefix() -> String {
    "dubcast".to_owned()
}

impl StoreConfig {
    /// Backend name for logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis { .. } => "redis",
        }
    }
}
