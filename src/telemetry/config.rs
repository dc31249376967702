use clap::ValueEnum;
use std::fmt;
use std::time::Duration;

/// Where spans and metrics are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExporterKind {
    /// Print to stdout, no network dependency
    Console,
    /// Stream to an OTLP/gRPC collector
    Network,
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExporterKind::Console => f.write_str("console"),
            ExporterKind::Network => f.write_str("network"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub kind: ExporterKind,
    /// Collector endpoint, only used by `ExporterKind::Network`.
    pub endpoint: Option<String>,
}

impl ExporterConfig {
    pub fn console() -> Self {
        Self {
            kind: ExporterKind::Console,
            endpoint: None,
        }
    }

    pub fn network(endpoint: impl Into<String>) -> Self {
        Self {
            kind: ExporterKind::Network,
            endpoint: Some(endpoint.into()),
        }
    }
}

/// Tuning for the batching span processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub scheduled_delay: Duration,
    pub max_queue_size: usize,
    pub max_export_batch_size: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            scheduled_delay: Duration::from_secs(5),
            max_queue_size: 2048,
            max_export_batch_size: 512,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub exporter: ExporterConfig,
    pub batch: BatchSettings,
    pub metric_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "otel-demo".to_string(),
            exporter: ExporterConfig::console(),
            batch: BatchSettings::default(),
            metric_interval: Duration::from_secs(60),
        }
    }
}
