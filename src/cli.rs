use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::config::AppConfig;
use crate::server::ServerConfig;
use crate::server::api::WorkDelay;
use crate::shutdown::{SecondSignalPolicy, ShutdownConfig};
use crate::telemetry::{BatchSettings, ExporterConfig, ExporterKind, LogFormat, TelemetryConfig};
use crate::Result;

#[derive(Parser, Debug, Clone)]
#[command(name = "otel-demo")]
#[command(version)]
#[command(about = "HTTP demo service with OpenTelemetry traces and metrics", long_about = None)]
pub struct Cli {
    /// Telemetry exporter
    #[arg(short, long, env = "OTEL_DEMO_EXPORTER", value_enum, default_value = "console")]
    pub exporter: ExporterKind,

    /// OTLP/gRPC collector endpoint (network exporter only)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Service name reported on every span and metric
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "otel-demo")]
    pub service_name: String,

    /// Address to bind to
    #[arg(long, env = "OTEL_DEMO_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port number
    #[arg(short, long, env = "OTEL_DEMO_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds allowed for the whole shutdown
    #[arg(long, env = "OTEL_DEMO_SHUTDOWN_TIMEOUT", default_value_t = 10)]
    pub shutdown_timeout: u64,

    /// What a second termination signal does while shutting down
    #[arg(long, env = "OTEL_DEMO_SECOND_SIGNAL", value_enum, default_value = "force-exit")]
    pub second_signal: SecondSignalPolicy,

    /// Metric export interval in milliseconds
    #[arg(long, env = "OTEL_METRIC_EXPORT_INTERVAL", default_value_t = 60_000)]
    pub metric_interval_ms: u64,

    /// Delay between span batch exports in milliseconds
    #[arg(long, env = "OTEL_BSP_SCHEDULE_DELAY", default_value_t = 5_000)]
    pub batch_delay_ms: u64,

    /// Maximum number of spans buffered before new ones are dropped
    #[arg(long, env = "OTEL_BSP_MAX_QUEUE_SIZE", default_value_t = 2048)]
    pub max_queue_size: usize,

    /// Minimum simulated work per request in milliseconds
    #[arg(long, env = "OTEL_DEMO_WORK_DELAY_MIN_MS", default_value_t = 100)]
    pub work_delay_min_ms: u64,

    /// Maximum simulated work per request in milliseconds
    #[arg(long, env = "OTEL_DEMO_WORK_DELAY_MAX_MS", default_value_t = 400)]
    pub work_delay_max_ms: u64,

    /// Log output format
    #[arg(long, env = "OTEL_DEMO_LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        let config = AppConfig {
            telemetry: TelemetryConfig {
                service_name: self.service_name,
                exporter: ExporterConfig {
                    kind: self.exporter,
                    endpoint: self.endpoint,
                },
                batch: BatchSettings {
                    scheduled_delay: Duration::from_millis(self.batch_delay_ms),
                    max_queue_size: self.max_queue_size,
                    ..BatchSettings::default()
                },
                metric_interval: Duration::from_millis(self.metric_interval_ms),
            },
            server: ServerConfig {
                addr: SocketAddr::new(self.host, self.port),
                work_delay: WorkDelay {
                    min: Duration::from_millis(self.work_delay_min_ms),
                    max: Duration::from_millis(self.work_delay_max_ms),
                },
            },
            shutdown: ShutdownConfig {
                timeout: Duration::from_secs(self.shutdown_timeout),
                second_signal: self.second_signal,
            },
            log_format: self.log_format,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network_args() {
        let cli = Cli::try_parse_from([
            "otel-demo",
            "--exporter",
            "network",
            "--endpoint",
            "http://collector:4317",
            "--port",
            "9090",
            "--shutdown-timeout",
            "3",
            "--second-signal",
            "ignore",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!(config.telemetry.exporter.kind, ExporterKind::Network);
        assert_eq!(
            config.telemetry.exporter.endpoint.as_deref(),
            Some("http://collector:4317")
        );
        assert_eq!(config.server.addr.port(), 9090);
        assert_eq!(config.shutdown.timeout, Duration::from_secs(3));
        assert_eq!(config.shutdown.second_signal, SecondSignalPolicy::Ignore);
    }

    #[test]
    fn test_rejects_zero_shutdown_timeout() {
        let cli = Cli::try_parse_from(["otel-demo", "--shutdown-timeout", "0"]).unwrap();
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn test_accepts_largest_shutdown_timeout() {
        let cli = Cli::try_parse_from(["otel-demo", "--shutdown-timeout", "18446744073709551615"])
            .unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.shutdown.timeout, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_rejects_unknown_exporter() {
        assert!(Cli::try_parse_from(["otel-demo", "--exporter", "carrier-pigeon"]).is_err());
    }
}
