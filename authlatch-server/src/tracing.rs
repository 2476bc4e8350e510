//! Logging setup, with optional OpenTelemetry export

use authlatch_core::LatchConfig;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self, Sampler, Tracer},
    Resource,
};
use std::time::Duration;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,authlatch=debug";

const SERVICE_NAME: &str = "authlatch-server";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Install the global subscriber
///
/// Console output is always on. With `config.otel_enabled` an OTLP layer is
/// added, exporting to `config.otel_endpoint`. Must run inside a tokio
/// runtime when OpenTelemetry is enabled.
pub fn init_logging(config: &LatchConfig) -> anyhow::Result<()> {
    let otel_layer = if config.otel_enabled {
        Some(OpenTelemetryLayer::new(otlp_tracer(config)?))
    } else {
        None
    };

    Registry::default()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init()?;

    if config.otel_enabled {
        tracing::info!(
            endpoint = %config.otel_endpoint,
            sample_rate = config.trace_sample_rate,
            "OpenTelemetry tracing enabled"
        );
    } else {
        tracing::debug!("Console logging enabled (set OTEL_ENABLED=true for OpenTelemetry)");
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn otlp_tracer(config: &LatchConfig) -> anyhow::Result<Tracer> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(config.otel_endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT);

    let resource = Resource::new(vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(sampler_for(config.trace_sample_rate))
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)?;

    Ok(tracer)
}

fn sampler_for(sample_rate: f64) -> Sampler {
    if sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sample_rate)
    }
}

/// Flush and shut down the global tracer provider
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
