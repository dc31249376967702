use clap::Parser;
use otel_demo::{DemoError, cli::Cli, commands};
use std::process::ExitCode;

/// Exit status after a second signal cut the drain short.
const FORCED_EXIT_CODE: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match commands::execute_serve(config).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(DemoError::ForcedExit(signal)) => {
            eprintln!("Received {} while shutting down, exiting immediately", signal);
            std::process::exit(i32::from(FORCED_EXIT_CODE));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to run server");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
