//! Deadline-bound, concurrent shutdown of the stoppable subsystems.

mod coordinator;
mod signal;

pub use coordinator::{CoordinatorState, ShutdownCoordinator};
pub use signal::{SecondSignalPolicy, TerminationSignal, TerminationSignals};

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{DemoError, Result};

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts too large to add to the current instant are clamped to this.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownConfig {
    pub timeout: Duration,
    pub second_signal: SecondSignalPolicy,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            second_signal: SecondSignalPolicy::ForceExit,
        }
    }
}

/// One deadline shared by every shutdown task, plus an explicit cancel switch.
#[derive(Debug, Clone)]
pub struct ShutdownContext {
    deadline: Instant,
    token: CancellationToken,
}

impl ShutdownContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout.min(FAR_FUTURE))
            .unwrap_or(now + Duration::from_secs(86_400));
        Self {
            deadline,
            token: CancellationToken::new(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the deadline passes or the context is cancelled.
    pub async fn done(&self) {
        tokio::select! {
            _ = tokio::time::sleep_until(self.deadline) => {}
            _ = self.token.cancelled() => {}
        }
    }

    /// Drive `fut` until it finishes or the context is done, whichever first.
    ///
    /// On expiry `fut` is dropped and `DemoError::ShutdownTimeout` is returned.
    pub async fn run<F, T>(&self, task: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            result = fut => result,
            _ = self.done() => Err(DemoError::ShutdownTimeout(task.to_string())),
        }
    }

    /// Run a blocking shutdown call on its own thread, bounded by the context.
    ///
    /// The thread is detached if the deadline fires first; whatever it was
    /// flushing is abandoned.
    pub async fn run_blocking<F>(&self, task: &str, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name(format!("{task}-shutdown"))
            .spawn(move || {
                let _ = tx.send(f());
            })?;

        self.run(task, async {
            rx.await.unwrap_or_else(|_| {
                Err(DemoError::ShutdownFailed {
                    task: task.to_string(),
                    reason: "shutdown thread exited without a result".to_string(),
                })
            })
        })
        .await
    }
}

/// A subsystem the coordinator can stop.
pub trait ShutdownTask: Send + Sync {
    fn name(&self) -> &'static str;

    fn run<'a>(&'a self, ctx: &'a ShutdownContext) -> BoxFuture<'a, Result<()>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Success,
    Error(String),
    TimedOut,
}

impl From<Result<()>> for ShutdownOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => ShutdownOutcome::Success,
            Err(DemoError::ShutdownTimeout(_)) => ShutdownOutcome::TimedOut,
            Err(e) => ShutdownOutcome::Error(e.to_string()),
        }
    }
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownOutcome::Success => f.write_str("success"),
            ShutdownOutcome::Error(detail) => write!(f, "error: {detail}"),
            ShutdownOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownResult {
    pub task: String,
    pub outcome: ShutdownOutcome,
    pub elapsed: Duration,
}

impl ShutdownResult {
    pub fn new(task: impl Into<String>, outcome: ShutdownOutcome, elapsed: Duration) -> Self {
        Self {
            task: task.into(),
            outcome,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ShutdownOutcome::Success
    }

    fn log(&self) {
        let elapsed_ms = self.elapsed.as_millis() as u64;
        match &self.outcome {
            ShutdownOutcome::Success => {
                tracing::info!(task = %self.task, elapsed_ms, "Shutdown task finished")
            }
            ShutdownOutcome::Error(detail) => {
                tracing::error!(task = %self.task, elapsed_ms, error = %detail, "Shutdown failed")
            }
            ShutdownOutcome::TimedOut => {
                tracing::warn!(task = %self.task, elapsed_ms, "Shutdown timed out, abandoning it")
            }
        }
    }
}

/// Every task's result, collected after the barrier or the deadline.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    results: Vec<ShutdownResult>,
    elapsed: Duration,
}

impl ShutdownReport {
    pub fn new(results: Vec<ShutdownResult>, elapsed: Duration) -> Self {
        Self { results, elapsed }
    }

    pub fn results(&self) -> &[ShutdownResult] {
        &self.results
    }

    pub fn get(&self, task: &str) -> Option<&ShutdownResult> {
        self.results.iter().find(|r| r.task == task)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_clean(&self) -> bool {
        self.results.iter().all(ShutdownResult::is_success)
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_clean() { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_future_result() {
        let ctx = ShutdownContext::with_timeout(Duration::from_secs(1));
        let value = ctx.run("quick", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_times_out_at_deadline() {
        let ctx = ShutdownContext::with_timeout(Duration::from_millis(50));
        let result: Result<()> = ctx.run("stuck", std::future::pending()).await;

        assert!(matches!(result, Err(DemoError::ShutdownTimeout(ref t)) if t == "stuck"));
        assert!(ctx.is_done());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_huge_timeout_is_clamped() {
        let ctx = ShutdownContext::with_timeout(Duration::from_secs(u64::MAX));

        assert!(!ctx.is_done());
        assert!(ctx.remaining() > Duration::from_secs(86_400 * 365));
        let value = ctx.run("quick", async { Ok(1) }).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_cancel_ends_context_early() {
        let ctx = ShutdownContext::with_timeout(Duration::from_secs(60));
        let cancel = ctx.clone();
        tokio::spawn(async move { cancel.cancel() });

        let result: Result<()> = ctx.run("cancelled", std::future::pending()).await;
        assert!(matches!(result, Err(DemoError::ShutdownTimeout(_))));
    }

    #[tokio::test]
    async fn test_run_blocking_abandons_slow_thread() {
        let ctx = ShutdownContext::with_timeout(Duration::from_millis(50));
        let started = std::time::Instant::now();

        let result = ctx
            .run_blocking("slow", || {
                std::thread::sleep(Duration::from_secs(2));
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DemoError::ShutdownTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_outcome_from_result() {
        assert_eq!(ShutdownOutcome::from(Ok(())), ShutdownOutcome::Success);
        assert_eq!(
            ShutdownOutcome::from(Err(DemoError::ShutdownTimeout("x".into()))),
            ShutdownOutcome::TimedOut
        );
        assert!(matches!(
            ShutdownOutcome::from(Err(DemoError::ConfigError("bad".into()))),
            ShutdownOutcome::Error(ref d) if d.contains("bad")
        ));
    }

    #[test]
    fn test_report_exit_code() {
        let clean = ShutdownReport::new(
            vec![ShutdownResult::new("a", ShutdownOutcome::Success, Duration::ZERO)],
            Duration::ZERO,
        );
        assert!(clean.is_clean());
        assert_eq!(clean.exit_code(), 0);

        let dirty = ShutdownReport::new(
            vec![
                ShutdownResult::new("a", ShutdownOutcome::Success, Duration::ZERO),
                ShutdownResult::new("b", ShutdownOutcome::TimedOut, Duration::ZERO),
            ],
            Duration::ZERO,
        );
        assert!(!dirty.is_clean());
        assert_eq!(dirty.exit_code(), 1);
        assert_eq!(dirty.get("b").unwrap().outcome, ShutdownOutcome::TimedOut);
    }
}
