mod config;
mod exporter;
mod meter;
mod tracer;

pub use config::{BatchSettings, ExporterConfig, ExporterKind, TelemetryConfig};
pub use exporter::{
    DEFAULT_OTLP_ENDPOINT, ExporterFactory, MetricExporterChoice, SpanExporterChoice,
};
pub use meter::{METER_TASK, MeterProviderManager};
pub use tracer::{TRACER_TASK, TracerProviderManager};

use clap::ValueEnum;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Instrumentation scope name for the demo's own tracer and meter.
pub const INSTRUMENTATION_NAME: &str = "otel-demo";

const DEFAULT_LOG_FILTER: &str = "otel_demo=info,tower_http=info";

/// `tracing` target whose spans are bridged into the tracer provider.
const BRIDGED_TARGET: &str = "otel_demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

/// Both providers, built once and shared with the server by reference.
pub struct Telemetry {
    pub tracer: TracerProviderManager,
    pub meter: MeterProviderManager,
}

impl Telemetry {
    /// Build the resource and both providers. Either both succeed or neither
    /// is kept.
    pub fn install(config: &TelemetryConfig) -> crate::Result<Self> {
        let resource = build_resource(&config.service_name);
        let tracer = TracerProviderManager::install(config, resource.clone())?;
        let meter = MeterProviderManager::install(config, resource)?;

        Ok(Self { tracer, meter })
    }
}

/// Service identity attached to every exported span and metric.
pub fn build_resource(service_name: &str) -> Resource {
    Resource::builder_empty()
        .with_service_name(service_name.to_string())
        .with_attributes([KeyValue::new("service.version", env!("CARGO_PKG_VERSION"))])
        .build()
}

/// Install the global `tracing` subscriber.
///
/// With a tracer, `tracing` spans are also bridged into the tracer provider.
pub fn init_logging(format: LogFormat, tracer: Option<SdkTracer>) -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .boxed(),
    };

    let otel_layer = tracer.map(|tracer| {
        tracing_opentelemetry::layer()
            .with_tracer(tracer)
            .with_filter(bridge_filter())
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Only the service's own spans reach the exporter; framework spans such as
/// the HTTP trace layer's stay in the log output.
fn bridge_filter() -> Targets {
    Targets::new().with_target(BRIDGED_TARGET, Level::TRACE)
}

/// Subscriber for tests; ignores a second install.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
