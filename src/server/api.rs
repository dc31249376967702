use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
};
use opentelemetry::KeyValue;
use opentelemetry::metrics::Counter;
use opentelemetry::trace::{Span as _, Tracer as _};
use opentelemetry_sdk::trace::SdkTracer;
use rand::Rng;
use std::time::Duration;

use crate::telemetry::{INSTRUMENTATION_NAME, Telemetry};

pub const DEMO_RESPONSE: &str = "OpenTelemetry + Zap is working!";
pub const DEMO_SPAN_NAME: &str = "handle-demo-request";
pub const REQUESTS_COUNTER: &str = "http_requests_total";

/// Bounded random pause that stands in for real work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkDelay {
    pub min: Duration,
    pub max: Duration,
}

impl WorkDelay {
    pub const NONE: WorkDelay = WorkDelay {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for WorkDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_millis(400),
        }
    }
}

/// Shared application state, handed the providers' instruments at startup.
#[derive(Clone)]
pub struct AppState {
    pub tracer: SdkTracer,
    pub requests: Counter<u64>,
    pub work_delay: WorkDelay,
}

impl AppState {
    pub fn new(telemetry: &Telemetry, work_delay: WorkDelay) -> Self {
        let requests = telemetry
            .meter
            .meter(INSTRUMENTATION_NAME)
            .u64_counter(REQUESTS_COUNTER)
            .with_description("Total number of HTTP requests received")
            .build();

        Self {
            tracer: telemetry.tracer.tracer(INSTRUMENTATION_NAME),
            requests,
            work_delay,
        }
    }
}

/// GET / - Demo endpoint
pub async fn demo(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> (StatusCode, &'static str) {
    let path = uri.path().to_string();
    let mut span = state.tracer.start(DEMO_SPAN_NAME);
    span.set_attribute(KeyValue::new("http.request.method", method.to_string()));
    span.set_attribute(KeyValue::new("url.path", path.clone()));

    tracing::info!(method = %method, url = %path, "Received request");
    state.requests.add(
        1,
        &[
            KeyValue::new("path", path),
            KeyValue::new("method", method.to_string()),
        ],
    );

    tokio::time::sleep(state.work_delay.sample()).await;

    span.end();
    (StatusCode::OK, DEMO_RESPONSE)
}
