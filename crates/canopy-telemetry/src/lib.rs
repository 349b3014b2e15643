//! Logging, tracing and metrics for canopy
//!
//! Logs always go to stdout through `tracing-subscriber`. When an OTLP
//! exporter is configured, spans and metrics are exported as well.

mod exporter;
pub mod metrics;
mod resource;

use std::time::Duration;

use canopy_config::TelemetryConfig;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};

/// Keeps exporters alive and flushes them on drop
#[must_use = "dropping the guard shuts telemetry down"]
pub struct TelemetryGuard {
    meter_provider: Option<SdkMeterProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.meter_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown meter provider: {e}");
        }
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown tracer provider: {e}");
        }
    }
}

/// Install the global subscriber and, if configured, OTLP export
///
/// An invalid `log_filter` falls back to `info`.
///
/// # Errors
///
/// Returns an error if an OTLP exporter cannot be built
pub fn init(config: Option<&TelemetryConfig>, log_filter: &str) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let mut guard = TelemetryGuard {
        meter_provider: None,
        tracer_provider: None,
    };

    let Some(config) = config.filter(|c| c.has_exporter()) else {
        tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        return Ok(guard);
    };

    let resource = resource::build(config);

    if let Some(exporter_config) = config.metrics_exporter() {
        let reader = PeriodicReader::builder(exporter::metrics(exporter_config)?)
            .with_interval(Duration::from_secs(exporter_config.export_interval))
            .build();

        let provider = SdkMeterProvider::builder()
            .with_resource(resource.clone())
            .with_reader(reader)
            .build();

        global::set_meter_provider(provider.clone());
        guard.meter_provider = Some(provider);
    }

    let otel_layer = match config.trace_exporter() {
        Some(exporter_config) => {
            let provider = SdkTracerProvider::builder()
                .with_resource(resource)
                .with_sampler(sampler(config))
                .with_batch_exporter(exporter::spans(exporter_config)?)
                .build();

            let layer = tracing_opentelemetry::layer().with_tracer(provider.tracer("canopy"));
            global::set_tracer_provider(provider.clone());
            guard.tracer_provider = Some(provider);
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Ok(guard)
}

fn sampler(config: &TelemetryConfig) -> Sampler {
    let (rate, parent_based) = config.sampling();

    let sampler = if rate >= 1.0 {
        Sampler::AlwaysOn
    } else if rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(rate)
    };

    if parent_based {
        Sampler::ParentBased(Box::new(sampler))
    } else {
        sampler
    }
}
