use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("Failed to build exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to install signal handler: {0}")]
    SignalError(#[source] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),

    #[error("{0} did not finish before the shutdown deadline")]
    ShutdownTimeout(String),

    #[error("{task} failed to shut down: {reason}")]
    ShutdownFailed { task: String, reason: String },

    #[error("Shutdown already started")]
    AlreadyDraining,

    #[error("Received {0} while draining, forcing exit")]
    ForcedExit(String),
}

pub type Result<T> = std::result::Result<T, DemoError>;
