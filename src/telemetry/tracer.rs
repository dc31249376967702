use futures::future::BoxFuture;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, SdkTracer, SdkTracerProvider, SpanExporter,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::config::{BatchSettings, TelemetryConfig};
use super::exporter::{ExporterFactory, SpanExporterChoice};
use crate::Result;
use crate::shutdown::{ShutdownContext, ShutdownTask};

pub const TRACER_TASK: &str = "tracer-provider";

/// Owns the tracer provider: resource, batching processor and exporter.
pub struct TracerProviderManager {
    provider: SdkTracerProvider,
    shut_down: AtomicBool,
}

impl TracerProviderManager {
    /// Build a provider for the configured exporter kind.
    ///
    /// Nothing is registered anywhere on error.
    pub fn install(config: &TelemetryConfig, resource: Resource) -> Result<Self> {
        let factory = ExporterFactory::from(&config.exporter);
        let manager = match factory.create_span_exporter(config.exporter.endpoint.as_deref())? {
            SpanExporterChoice::Console(exporter) => {
                Self::with_exporter(exporter, resource, &config.batch)
            }
            SpanExporterChoice::Otlp(exporter) => {
                Self::with_exporter(exporter, resource, &config.batch)
            }
        };

        tracing::debug!(exporter = %factory.kind(), "Tracer provider installed");
        Ok(manager)
    }

    pub fn with_exporter<E>(exporter: E, resource: Resource, batch: &BatchSettings) -> Self
    where
        E: SpanExporter + 'static,
    {
        let batch_config = BatchConfigBuilder::default()
            .with_scheduled_delay(batch.scheduled_delay)
            .with_max_queue_size(batch.max_queue_size)
            .with_max_export_batch_size(batch.max_export_batch_size.min(batch.max_queue_size))
            .build();

        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(batch_config)
            .build();

        let provider = SdkTracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(resource)
            .build();

        Self {
            provider,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    pub fn tracer(&self, name: &'static str) -> SdkTracer {
        self.provider.tracer(name)
    }

    /// Export every buffered span now. Blocks the calling thread.
    pub fn force_flush(&self) -> Result<()> {
        self.provider.force_flush()?;
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Flush buffered spans and close the exporter, bounded by `ctx`.
    ///
    /// Only the first call does any work. Spans still queued when the deadline
    /// fires are lost.
    pub async fn shutdown(&self, ctx: &ShutdownContext) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let provider = self.provider.clone();
        let budget = ctx.remaining();
        ctx.run_blocking(TRACER_TASK, move || shutdown_provider(&provider, budget))
            .await
    }
}

fn shutdown_provider(provider: &SdkTracerProvider, timeout: Duration) -> Result<()> {
    match provider.shutdown_with_timeout(timeout) {
        Ok(()) | Err(OTelSdkError::AlreadyShutdown) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ShutdownTask for TracerProviderManager {
    fn name(&self) -> &'static str {
        TRACER_TASK
    }

    fn run<'a>(&'a self, ctx: &'a ShutdownContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.shutdown(ctx))
    }
}
