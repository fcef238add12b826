use std::net::SocketAddr;

use serde::Deserialize;
use url::Url;

use crate::{cors::CorsConfig, health::HealthConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Externally visible origin used to build segment delivery URLs
    ///
    /// When unset, the origin is derived from `X-Forwarded-Proto` and `Host`
    /// of the request that renders the playlist.
    #[serde(default)]
    pub public_base_url: Option<Url>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}
