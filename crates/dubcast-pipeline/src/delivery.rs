//! Segment delivery: resolving a playlist entry to audio bytes
//!
//! A segment that is not ready yet is answered with a deferral and queued
//! for synthesis. Origin failures are reported with a growing retry hint
//! until the client has retried `max_fetch_retries` times.

use dubcast_store::{SegmentId, SegmentState, StoreError};
use dubcast_telemetry::{KeyValue, metrics};
use media::{FetchedAudio, MediaError, normalize_reference};
use url::Url;

use crate::Pipeline;
use crate::error::DeliveryError;

/// URL a player fetches segment `id` from
pub fn proxy_url(base: &str, id: SegmentId) -> String {
    format!("{}/api/audio-proxy?segmentId={id}", base.trim_end_matches('/'))
}

/// Successful delivery outcome
#[derive(Debug)]
pub enum Delivery {
    Audio(FetchedAudio),
    /// Not synthesized yet; ask again after `retry_after` seconds
    Processing { retry_after: u64 },
}

impl Pipeline {
    /// Resolve a segment to its audio
    ///
    /// `retry` is the number of times the client already retried this
    /// request. Unprocessed segments trigger a single-segment advance.
    #[tracing::instrument(skip(self, range), fields(video_id = tracing::field::Empty))]
    pub async fn deliver_segment(
        self: &std::sync::Arc<Self>,
        id: SegmentId,
        retry: u32,
        range: Option<&str>,
    ) -> Result<Delivery, DeliveryError> {
        let segment = self.store.segment(id).await?.ok_or(DeliveryError::NotFound(id))?;
        tracing::Span::current().record("video_id", segment.video_id.0);

        match segment.state {
            SegmentState::Failed => Err(DeliveryError::Failed {
                id,
                last_error: segment.last_error,
            }),
            SegmentState::Unprocessed | SegmentState::Processing => {
                metrics::pipeline()
                    .deliveries_deferred
                    .add(1, &[KeyValue::new("state", segment.state.as_str())]);
                self.spawn_advance(segment.video_id, 1);

                Ok(Delivery::Processing {
                    retry_after: self.config.delivery.processing_retry_after,
                })
            }
            SegmentState::Processed => {
                let reference = segment.audio_url.ok_or_else(|| StoreError::Corrupt {
                    key: id.to_string(),
                    reason: "processed segment without audio".to_owned(),
                })?;
                let url = Url::parse(&reference).map_err(|e| StoreError::Corrupt {
                    key: id.to_string(),
                    reason: format!("invalid audio URL: {e}"),
                })?;

                self.fetch(&url, retry, range).await
            }
        }
    }

    /// Fetch audio by direct reference, limited to allowed hosts
    #[tracing::instrument(skip(self, range))]
    pub async fn deliver_reference(
        &self,
        reference: &str,
        retry: u32,
        range: Option<&str>,
    ) -> Result<Delivery, DeliveryError> {
        let url = normalize_reference(reference, &self.config.storage)?;
        let host = url.host_str().unwrap_or_default();

        if !self.host_allowed(host) {
            tracing::warn!(host, "direct audio reference to a host outside the allow list");
            return Err(DeliveryError::HostNotAllowed(host.to_owned()));
        }

        self.fetch(&url, retry, range).await
    }

    fn host_allowed(&self, host: &str) -> bool {
        let allowed = &self.config.delivery.allowed_hosts;
        if allowed.is_empty() {
            return self.config.storage.public_base.host_str() == Some(host);
        }
        allowed.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    async fn fetch(&self, url: &Url, retry: u32, range: Option<&str>) -> Result<Delivery, DeliveryError> {
        let error = match self.fetcher.fetch(url, range).await {
            Ok(audio) => return Ok(Delivery::Audio(audio)),
            Err(e) => e,
        };

        metrics::pipeline().delivery_upstream_errors.add(1, &[]);
        let delivery = &self.config.delivery;

        if retry >= delivery.max_fetch_retries {
            tracing::error!(%url, retry, error = %error, "audio origin failed, giving up");
            return Err(DeliveryError::Exhausted { retries: retry });
        }

        let retry_after = delivery.upstream_retry_after.saturating_mul(u64::from(retry) + 1);
        tracing::warn!(%url, retry, retry_after, error = %error, "audio origin failed");

        Err(match error {
            MediaError::FetchTimeout => DeliveryError::Timeout { retry_after },
            _ => DeliveryError::Upstream { retry_after },
        })
    }
}
