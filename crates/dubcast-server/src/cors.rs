use std::str::FromStr;

use dubcast_config::{AnyOrArray, CorsConfig};
use http::Method;
use http::header::HeaderName;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new();

    // Origins
    layer = match &config.origins {
        AnyOrArray::Any => layer.allow_origin(AllowOrigin::any()),
        AnyOrArray::List(origins) => layer.allow_origin(parse_entries::<http::HeaderValue>("origin", origins)),
    };

    // Methods
    layer = match &config.methods {
        AnyOrArray::Any => layer.allow_methods(AllowMethods::any()),
        AnyOrArray::List(methods) => layer.allow_methods(parse_entries::<Method>("method", methods)),
    };

    // Headers
    layer = match &config.headers {
        AnyOrArray::Any => layer.allow_headers(AllowHeaders::any()),
        AnyOrArray::List(headers) => layer.allow_headers(parse_entries::<HeaderName>("header", headers)),
    };

    // Players read Content-Range and Content-Length on range requests
    if !config.expose_headers.is_empty() {
        layer = layer.expose_headers(parse_entries::<HeaderName>("expose header", &config.expose_headers));
    }

    // Max age
    if let Some(duration) = config.max_age_duration() {
        layer = layer.max_age(duration);
    }

    layer
}

/// Parse configured values, skipping the ones that are not valid
fn parse_entries<T: FromStr>(kind: &str, values: &[String]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                tracing::warn!(kind, value = %value, "ignoring invalid CORS entry");
            }
            parsed
        })
        .collect()
}
