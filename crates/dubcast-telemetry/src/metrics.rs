//! Metric names and instruments for the segment pipeline
//!
//! Instruments come from the global meter, which is a no-op until an OTLP
//! exporter is configured.

use std::sync::OnceLock;
use std::time::Instant;

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub const SEGMENT_SYNTHESIZED: &str = "dubcast.segment.synthesized";
pub const SEGMENT_FAILED: &str = "dubcast.segment.failed";
pub const SYNTHESIS_DURATION: &str = "dubcast.synthesis.duration";
pub const DELIVERY_DEFERRED: &str = "dubcast.delivery.deferred";
pub const DELIVERY_UPSTREAM_ERROR: &str = "dubcast.delivery.upstream_error";

/// Instruments recorded by the pipeline
pub struct PipelineMetrics {
    pub segments_synthesized: Counter<u64>,
    pub segments_failed: Counter<u64>,
    pub synthesis_duration: Histogram<f64>,
    pub deliveries_deferred: Counter<u64>,
    pub delivery_upstream_errors: Counter<u64>,
}

/// Lazily created pipeline instruments
pub fn pipeline() -> &'static PipelineMetrics {
    static METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

    METRICS.get_or_init(|| {
        let meter = global::meter("dubcast");

        PipelineMetrics {
            segments_synthesized: meter
                .u64_counter(SEGMENT_SYNTHESIZED)
                .with_description("Segments synthesized and persisted")
                .build(),
            segments_failed: meter
                .u64_counter(SEGMENT_FAILED)
                .with_description("Segments that exhausted their synthesis attempts")
                .build(),
            synthesis_duration: meter
                .f64_histogram(SYNTHESIS_DURATION)
                .with_unit("s")
                .with_description("Wall-clock time of one segment synthesis including retries")
                .build(),
            deliveries_deferred: meter
                .u64_counter(DELIVERY_DEFERRED)
                .with_description("Segment requests answered with a retry hint")
                .build(),
            delivery_upstream_errors: meter
                .u64_counter(DELIVERY_UPSTREAM_ERROR)
                .with_description("Failed audio fetches from the storage origin")
                .build(),
        }
    })
}

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[opentelemetry::KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}
