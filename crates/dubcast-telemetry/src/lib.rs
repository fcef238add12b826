//! Telemetry for dubcast
//!
//! Structured logging through `tracing`, with optional OTLP export of spans
//! and pipeline metrics.

mod metadata;
pub mod metrics;

use dubcast_config::TelemetryConfig;
use dubcast_config::telemetry::{LogFormat, OtlpConfig, OtlpProtocol};
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

pub use opentelemetry::KeyValue;

/// Keeps OTLP providers alive and shuts them down, flushing, on drop
#[derive(Default)]
pub struct TelemetryGuard {
    providers: Option<(SdkMeterProvider, SdkTracerProvider)>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        let Some((meters, tracers)) = self.providers.take() else {
            return;
        };
        if let Err(e) = meters.shutdown() {
            eprintln!("failed to shutdown meter provider: {e}");
        }
        if let Err(e) = tracers.shutdown() {
            eprintln!("failed to shutdown tracer provider: {e}");
        }
    }
}

/// Initialize logging and, when `[telemetry.otlp]` is set, OTLP export
///
/// `RUST_LOG` takes precedence over `default_filter`. The returned guard
/// must be held for the lifetime of the process.
///
/// # Errors
///
/// Returns an error if an OTLP exporter cannot be built or a global
/// subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>, default_filter: &str) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.map_or(LogFormat::Text, |c| c.log_format);
    let registry = tracing_subscriber::registry().with(fmt_layer(format)).with(filter);

    let Some((config, otlp)) = config.and_then(|c| c.otlp.as_ref().map(|o| (c, o))) else {
        registry.try_init()?;
        return Ok(TelemetryGuard::default());
    };

    let resource = metadata::build_resource(config);

    let meters = meter_provider(otlp, resource.clone())?;
    global::set_meter_provider(meters.clone());

    let tracers = tracer_provider(otlp, resource)?;
    global::set_tracer_provider(tracers.clone());

    registry
        .with(tracing_opentelemetry::layer().with_tracer(tracers.tracer("dubcast")))
        .try_init()?;

    tracing::debug!(endpoint = %otlp.endpoint, protocol = ?otlp.protocol, "otlp export enabled");

    Ok(TelemetryGuard {
        providers: Some((meters, tracers)),
    })
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn meter_provider(otlp: &OtlpConfig, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let builder = MetricExporter::builder();
    let exporter = match otlp.protocol {
        OtlpProtocol::Grpc => builder.with_tonic().with_endpoint(otlp.endpoint.as_str()).build(),
        OtlpProtocol::HttpProto => builder.with_http().with_endpoint(otlp.endpoint.as_str()).build(),
    }
    .map_err(|e| anyhow::anyhow!("failed to build OTLP metric exporter: {e}"))?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(otlp.metrics_interval)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

fn tracer_provider(otlp: &OtlpConfig, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let builder = SpanExporter::builder();
    let exporter = match otlp.protocol {
        OtlpProtocol::Grpc => builder.with_tonic().with_endpoint(otlp.endpoint.as_str()).build(),
        OtlpProtocol::HttpProto => builder.with_http().with_endpoint(otlp.endpoint.as_str()).build(),
    }
    .map_err(|e| anyhow::anyhow!("failed to build OTLP span exporter: {e}"))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(sampler(otlp.sampling_ratio, otlp.parent_based))
        .with_batch_exporter(exporter)
        .build())
}

fn sampler(ratio: f64, parent_based: bool) -> Sampler {
    let root = match ratio {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::TraceIdRatioBased(r),
    };

    if parent_based {
        Sampler::ParentBased(Box::new(root))
    } else {
        root
    }
}
