use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

/// Optional OTLP export of spans and probe/toggle metrics
///
/// Logs always go to stdout; this section only adds export.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Extra resource attributes, e.g. `deployment.environment`
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    /// Exporter used by both signals unless a section overrides it
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    #[serde(default)]
    pub tracing: Option<TracingConfig>,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

impl TelemetryConfig {
    pub fn has_exporter(&self) -> bool {
        self.exporter.is_some() || self.trace_exporter().is_some() || self.metrics_exporter().is_some()
    }

    /// Span exporter, the `[tracing]` override first
    pub fn trace_exporter(&self) -> Option<&ExporterConfig> {
        self.tracing
            .as_ref()
            .and_then(|t| t.exporter.as_ref())
            .or(self.exporter.as_ref())
    }

    /// Metric exporter, the `[metrics]` override first
    pub fn metrics_exporter(&self) -> Option<&ExporterConfig> {
        self.metrics
            .as_ref()
            .and_then(|m| m.exporter.as_ref())
            .or(self.exporter.as_ref())
    }

    /// Sampling ratio and whether parent decisions are honoured
    pub fn sampling(&self) -> (f64, bool) {
        self.tracing
            .as_ref()
            .map_or((1.0, true), |t| (t.sampling_rate, t.parent_based))
    }
}

/// One OTLP collector
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// Seconds between metric pushes
    #[serde(default = "default_export_interval")]
    pub export_interval: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    #[default]
    Grpc,
    HttpProto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingConfig {
    /// Fraction of root spans kept, 0.0 to 1.0
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    #[serde(default = "default_parent_based")]
    pub parent_based: bool,
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
}

fn default_service_name() -> String {
    "canopy".to_string()
}

const fn default_export_interval() -> u64 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_sampling_rate() -> f64 {
    1.0
}

#[allow(clippy::missing_const_for_fn)]
fn default_parent_based() -> bool {
    true
}
