use dubcast_config::StorageConfig;
use url::Url;

use crate::{MediaError, Result};

/// Turn a synthesis reference into a publicly fetchable URL
///
/// Accepted shapes:
/// - `gs://<bucket>/<object>`, served from the storage public origin
/// - `s3://<bucket>/<key>`, served from the bucket's virtual-hosted endpoint
/// - `http(s)://...`, already resolved
pub fn normalize_reference(reference: &str, storage: &StorageConfig) -> Result<Url> {
    let reference = reference.trim();

    if let Some(path) = reference.strip_prefix("gs://") {
        let (bucket, object) = split_object_path(reference, path)?;
        let mut url = storage.public_base.clone();
        url.path_segments_mut()
            .map_err(|()| MediaError::Config(format!("storage public_base cannot be a base URL: {}", storage.public_base)))?
            .pop_if_empty()
            .push(bucket)
            .extend(object.split('/'));
        return Ok(url);
    }

    if let Some(path) = reference.strip_prefix("s3://") {
        let (bucket, object) = split_object_path(reference, path)?;
        let mut url = Url::parse(&format!("https://{bucket}.s3.amazonaws.com/"))
            .map_err(|_| MediaError::Format(reference.to_owned()))?;
        url.path_segments_mut()
            .map_err(|()| MediaError::Format(reference.to_owned()))?
            .pop_if_empty()
            .extend(object.split('/'));
        return Ok(url);
    }

    let url = Url::parse(reference).map_err(|_| MediaError::Format(reference.to_owned()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(MediaError::Format(reference.to_owned())),
    }
}

fn split_object_path<'a>(reference: &str, path: &'a str) -> Result<(&'a str, &'a str)> {
    path.split_once('/')
        .filter(|(bucket, object)| !bucket.is_empty() && !object.is_empty())
        .ok_or_else(|| MediaError::Format(reference.to_owned()))
}
