use colored::*;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::server::{self, RequestServer, api::AppState};
use crate::shutdown::{ShutdownCoordinator, ShutdownReport, TerminationSignals};
use crate::telemetry::{self, INSTRUMENTATION_NAME, Telemetry};
use crate::Result;

/// Run the service until a termination signal has been handled.
///
/// Startup failures return before anything is served. The report's exit code
/// reflects whether every subsystem shut down cleanly.
pub async fn execute_serve(config: AppConfig) -> Result<ShutdownReport> {
    let telemetry = Telemetry::install(&config.telemetry)?;
    telemetry::init_logging(
        config.log_format,
        Some(telemetry.tracer.tracer(INSTRUMENTATION_NAME)),
    )?;

    print_banner(&config);

    let mut signals = TerminationSignals::install()?;
    let state = AppState::new(&telemetry, config.server.work_delay);
    let server = RequestServer::start(config.server.addr, server::router(state)).await?;

    let Telemetry { tracer, meter } = telemetry;
    let coordinator = ShutdownCoordinator::new(config.shutdown.timeout)
        .with_second_signal(config.shutdown.second_signal)
        .with_task(Arc::new(tracer))
        .with_task(Arc::new(meter))
        .with_task(Arc::new(server));

    let report = coordinator.run(&mut signals).await?;
    tracing::info!("Server is shutting down!");

    Ok(report)
}

fn print_banner(config: &AppConfig) {
    println!("{}", "Starting otel-demo...".bright_blue());
    println!("  Address:  {}", config.server.addr);
    println!("  Exporter: {}", config.telemetry.exporter.kind);
    if let Some(ref endpoint) = config.telemetry.exporter.endpoint {
        println!("  Endpoint: {}", endpoint);
    }
    println!("  Service:  {}", config.telemetry.service_name);
    println!("  Shutdown: {}s", config.shutdown.timeout.as_secs());
    println!();
}
