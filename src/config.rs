use crate::server::ServerConfig;
use crate::shutdown::ShutdownConfig;
use crate::telemetry::{ExporterKind, LogFormat, TelemetryConfig};
use crate::{DemoError, Result};

/// Everything the service needs at startup, resolved once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub server: ServerConfig,
    pub shutdown: ShutdownConfig,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig::default(),
            server: ServerConfig::default(),
            shutdown: ShutdownConfig::default(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shutdown.timeout.is_zero() {
            return Err(DemoError::ConfigError(
                "shutdown timeout must be greater than zero".to_string(),
            ));
        }
        if self.telemetry.metric_interval.is_zero() {
            return Err(DemoError::ConfigError(
                "metric export interval must be greater than zero".to_string(),
            ));
        }
        if self.telemetry.batch.max_queue_size == 0 {
            return Err(DemoError::ConfigError(
                "span queue size must be greater than zero".to_string(),
            ));
        }
        if self.server.work_delay.min > self.server.work_delay.max {
            return Err(DemoError::ConfigError(format!(
                "work delay min ({:?}) exceeds max ({:?})",
                self.server.work_delay.min, self.server.work_delay.max
            )));
        }
        if let Some(endpoint) = &self.telemetry.exporter.endpoint {
            if self.telemetry.exporter.kind == ExporterKind::Console {
                tracing::debug!(%endpoint, "Endpoint ignored by the console exporter");
            } else if endpoint.trim().is_empty() {
                return Err(DemoError::ConfigError(
                    "network exporter endpoint is empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
