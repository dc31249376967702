//! Exporter construction, resolved once per `ExporterKind`.
//!
//! Network exporters speak OTLP over gRPC on a plaintext channel. Building one
//! does not connect; connection errors surface on the first export. The tonic
//! channel spawns its worker on the current tokio runtime, so network exporters
//! must be built from inside one.

use opentelemetry_otlp::WithExportConfig;
use std::time::Duration;

use super::config::{ExporterConfig, ExporterKind};
use crate::Result;

pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

pub enum SpanExporterChoice {
    Console(opentelemetry_stdout::SpanExporter),
    Otlp(opentelemetry_otlp::SpanExporter),
}

pub enum MetricExporterChoice {
    Console(opentelemetry_stdout::MetricExporter),
    Otlp(opentelemetry_otlp::MetricExporter),
}

type SpanConstructor = fn(Option<&str>) -> Result<SpanExporterChoice>;
type MetricConstructor = fn(Option<&str>) -> Result<MetricExporterChoice>;

/// Builds span and metric exporters for one backend kind.
#[derive(Clone, Copy)]
pub struct ExporterFactory {
    kind: ExporterKind,
    span: SpanConstructor,
    metric: MetricConstructor,
}

impl ExporterFactory {
    pub fn for_kind(kind: ExporterKind) -> Self {
        let (span, metric): (SpanConstructor, MetricConstructor) = match kind {
            ExporterKind::Console => (console_span_exporter, console_metric_exporter),
            ExporterKind::Network => (otlp_span_exporter, otlp_metric_exporter),
        };
        Self { kind, span, metric }
    }

    pub fn kind(&self) -> ExporterKind {
        self.kind
    }

    pub fn create_span_exporter(&self, endpoint: Option<&str>) -> Result<SpanExporterChoice> {
        (self.span)(endpoint)
    }

    pub fn create_metric_exporter(&self, endpoint: Option<&str>) -> Result<MetricExporterChoice> {
        (self.metric)(endpoint)
    }
}

impl From<&ExporterConfig> for ExporterFactory {
    fn from(config: &ExporterConfig) -> Self {
        Self::for_kind(config.kind)
    }
}

fn console_span_exporter(_endpoint: Option<&str>) -> Result<SpanExporterChoice> {
    Ok(SpanExporterChoice::Console(
        opentelemetry_stdout::SpanExporter::default(),
    ))
}

fn console_metric_exporter(_endpoint: Option<&str>) -> Result<MetricExporterChoice> {
    Ok(MetricExporterChoice::Console(
        opentelemetry_stdout::MetricExporter::default(),
    ))
}

fn otlp_span_exporter(endpoint: Option<&str>) -> Result<SpanExporterChoice> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.unwrap_or(DEFAULT_OTLP_ENDPOINT))
        .with_timeout(EXPORT_TIMEOUT)
        .build()?;

    Ok(SpanExporterChoice::Otlp(exporter))
}

fn otlp_metric_exporter(endpoint: Option<&str>) -> Result<MetricExporterChoice> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.unwrap_or(DEFAULT_OTLP_ENDPOINT))
        .with_timeout(EXPORT_TIMEOUT)
        .build()?;

    Ok(MetricExporterChoice::Otlp(exporter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DemoError;

    #[test]
    fn test_console_factory_builds_without_runtime() {
        let factory = ExporterFactory::for_kind(ExporterKind::Console);
        assert_eq!(factory.kind(), ExporterKind::Console);

        assert!(matches!(
            factory.create_span_exporter(None),
            Ok(SpanExporterChoice::Console(_))
        ));
        assert!(matches!(
            factory.create_metric_exporter(Some("ignored")),
            Ok(MetricExporterChoice::Console(_))
        ));
    }

    #[tokio::test]
    async fn test_network_factory_does_not_connect() {
        // Nothing listens on this port; building must still succeed.
        let factory = ExporterFactory::from(&ExporterConfig::network("http://127.0.0.1:1"));

        assert!(matches!(
            factory.create_span_exporter(Some("http://127.0.0.1:1")),
            Ok(SpanExporterChoice::Otlp(_))
        ));
        assert!(matches!(
            factory.create_metric_exporter(None),
            Ok(MetricExporterChoice::Otlp(_))
        ));
    }

    #[tokio::test]
    async fn test_network_factory_rejects_invalid_endpoint() {
        let factory = ExporterFactory::for_kind(ExporterKind::Network);

        let result = factory.create_span_exporter(Some("not a uri"));
        assert!(matches!(result, Err(DemoError::ExporterBuild(_))));
    }
}
