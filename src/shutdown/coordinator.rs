use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::{
    SecondSignalPolicy, ShutdownContext, ShutdownOutcome, ShutdownReport, ShutdownResult,
    ShutdownTask, TerminationSignals,
};
use crate::{DemoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Running,
    Draining,
    Stopped,
}

/// Stops every registered task concurrently under one shared deadline.
///
/// A task that fails or hangs never cancels its siblings; each one gets the
/// whole deadline and reports its own `ShutdownResult`.
pub struct ShutdownCoordinator {
    tasks: Vec<Arc<dyn ShutdownTask>>,
    timeout: Duration,
    second_signal: SecondSignalPolicy,
    state: watch::Sender<CoordinatorState>,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Running);
        Self {
            tasks: Vec::new(),
            timeout,
            second_signal: SecondSignalPolicy::ForceExit,
            state,
        }
    }

    pub fn with_task(mut self, task: Arc<dyn ShutdownTask>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_second_signal(mut self, policy: SecondSignalPolicy) -> Self {
        self.second_signal = policy;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Wait for a termination signal, then drain.
    ///
    /// With `SecondSignalPolicy::ForceExit` a further signal during the drain
    /// abandons it and returns `DemoError::ForcedExit`.
    pub async fn run(&self, signals: &mut TerminationSignals) -> Result<ShutdownReport> {
        if let Some(signal) = signals.recv().await {
            tracing::info!(%signal, "Termination signal received, draining");
        } else {
            tracing::warn!("Signal source closed, draining");
        }

        let drain = self.drain();
        let report = match self.second_signal {
            SecondSignalPolicy::Ignore => drain.await,
            SecondSignalPolicy::ForceExit => {
                tokio::pin!(drain);
                tokio::select! {
                    report = &mut drain => report,
                    Some(signal) = signals.recv() => {
                        tracing::warn!(%signal, "Second termination signal, abandoning drain");
                        return Err(DemoError::ForcedExit(signal.to_string()));
                    }
                }
            }
        };

        report.ok_or(DemoError::AlreadyDraining)
    }

    /// Stop every task and collect their results.
    ///
    /// Returns `None` if a drain has already started.
    pub async fn drain(&self) -> Option<ShutdownReport> {
        let entered = self.state.send_if_modified(|state| {
            if *state == CoordinatorState::Running {
                *state = CoordinatorState::Draining;
                true
            } else {
                false
            }
        });
        if !entered {
            return None;
        }

        let ctx = ShutdownContext::with_timeout(self.timeout);
        let started = Instant::now();
        tracing::info!(
            tasks = self.tasks.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Shutting down"
        );

        let mut set = JoinSet::new();
        let mut pending: Vec<&'static str> = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let task = Arc::clone(task);
            let ctx = ctx.clone();
            pending.push(task.name());

            set.spawn(async move {
                let name = task.name();
                let task_started = Instant::now();
                let outcome = match AssertUnwindSafe(ctx.run(name, task.run(&ctx)))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => ShutdownOutcome::from(result),
                    Err(_) => ShutdownOutcome::Error("shutdown task panicked".to_string()),
                };
                ShutdownResult::new(name, outcome, task_started.elapsed())
            });
        }

        let mut results = Vec::with_capacity(pending.len());
        let deadline = tokio::time::sleep_until(ctx.deadline());
        tokio::pin!(deadline);

        let mut record = |result: ShutdownResult| {
            result.log();
            if let Some(pos) = pending.iter().position(|name| *name == result.task) {
                pending.swap_remove(pos);
            }
            results.push(result);
        };

        loop {
            tokio::select! {
                biased;
                joined = set.join_next() => match joined {
                    Some(Ok(result)) => record(result),
                    // Tasks catch their own panics and are only aborted below.
                    Some(Err(_)) => {}
                    None => break,
                },
                _ = &mut deadline => break,
            }
        }

        // Tasks that finished right at the deadline keep their real outcome.
        while let Some(joined) = set.try_join_next() {
            if let Ok(result) = joined {
                record(result);
            }
        }

        ctx.cancel();
        set.abort_all();
        for name in pending {
            let result = ShutdownResult::new(name, ShutdownOutcome::TimedOut, started.elapsed());
            result.log();
            results.push(result);
        }

        let report = ShutdownReport::new(results, started.elapsed());
        self.state.send_replace(CoordinatorState::Stopped);
        tracing::info!(
            clean = report.is_clean(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "Shutdown complete"
        );

        Some(report)
    }
}
