use canopy_config::{ExportProtocol, ExporterConfig};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};

pub fn metrics(config: &ExporterConfig) -> anyhow::Result<MetricExporter> {
    let builder = MetricExporter::builder();

    let exporter = match config.protocol {
        ExportProtocol::Grpc => builder.with_tonic().with_endpoint(config.endpoint.as_str()).build(),
        ExportProtocol::HttpProto => builder.with_http().with_endpoint(config.endpoint.as_str()).build(),
    };

    exporter.map_err(|e| anyhow::anyhow!("failed to build {:?} metrics exporter: {e}", config.protocol))
}

pub fn spans(config: &ExporterConfig) -> anyhow::Result<SpanExporter> {
    let builder = SpanExporter::builder();

    let exporter = match config.protocol {
        ExportProtocol::Grpc => builder.with_tonic().with_endpoint(config.endpoint.as_str()).build(),
        ExportProtocol::HttpProto => builder.with_http().with_endpoint(config.endpoint.as_str()).build(),
    };

    exporter.map_err(|e| anyhow::anyhow!("failed to build {:?} span exporter: {e}", config.protocol))
}
