use futures::future::BoxFuture;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::config::TelemetryConfig;
use super::exporter::{ExporterFactory, MetricExporterChoice};
use crate::Result;
use crate::shutdown::{ShutdownContext, ShutdownTask};

pub const METER_TASK: &str = "meter-provider";

/// Owns the meter provider: resource, periodic reader and exporter.
pub struct MeterProviderManager {
    provider: SdkMeterProvider,
    interval: Duration,
    shut_down: AtomicBool,
}

impl MeterProviderManager {
    pub fn install(config: &TelemetryConfig, resource: Resource) -> Result<Self> {
        let factory = ExporterFactory::from(&config.exporter);
        let manager = match factory.create_metric_exporter(config.exporter.endpoint.as_deref())? {
            MetricExporterChoice::Console(exporter) => {
                Self::with_exporter(exporter, resource, config.metric_interval)
            }
            MetricExporterChoice::Otlp(exporter) => {
                Self::with_exporter(exporter, resource, config.metric_interval)
            }
        };

        tracing::debug!(
            exporter = %factory.kind(),
            interval_ms = config.metric_interval.as_millis() as u64,
            "Meter provider installed"
        );
        Ok(manager)
    }

    pub fn with_exporter<E>(exporter: E, resource: Resource, interval: Duration) -> Self
    where
        E: PushMetricExporter + 'static,
    {
        let reader = PeriodicReader::builder(exporter)
            .with_interval(interval)
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        Self {
            provider,
            interval,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    pub fn meter(&self, name: &'static str) -> Meter {
        self.provider.meter(name)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one collect-and-export cycle now. Blocks the calling thread.
    pub fn force_flush(&self) -> Result<()> {
        self.provider.force_flush()?;
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Export one final collection and release the reader, bounded by `ctx`.
    ///
    /// Only the first call does any work; the final export is abandoned if the
    /// deadline fires first.
    pub async fn shutdown(&self, ctx: &ShutdownContext) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let provider = self.provider.clone();
        let budget = ctx.remaining();
        ctx.run_blocking(METER_TASK, move || shutdown_provider(&provider, budget))
            .await
    }
}

fn shutdown_provider(provider: &SdkMeterProvider, timeout: Duration) -> Result<()> {
    match provider.shutdown_with_timeout(timeout) {
        Ok(()) | Err(OTelSdkError::AlreadyShutdown) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ShutdownTask for MeterProviderManager {
    fn name(&self) -> &'static str {
        METER_TASK
    }

    fn run<'a>(&'a self, ctx: &'a ShutdownContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.shutdown(ctx))
    }
}
