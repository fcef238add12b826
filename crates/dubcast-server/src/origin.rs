use http::HeaderMap;
use url::Url;

/// Externally visible origin for building delivery URLs
///
/// The configured public URL wins. Otherwise the origin is taken from
/// `X-Forwarded-Proto` and `X-Forwarded-Host` (or `Host`) of the request.
pub(crate) fn public_base(configured: Option<&Url>, headers: &HeaderMap) -> String {
    if let Some(url) = configured {
        return url.as_str().trim_end_matches('/').to_owned();
    }

    let proto = first_value(headers, "x-forwarded-proto").unwrap_or("http");
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, "host"))
        .unwrap_or("localhost");

    format!("{proto}://{host}")
}

/// First entry of a possibly comma-separated header
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
