use clap::ValueEnum;
use std::fmt;
use tokio::sync::mpsc;

use crate::{DemoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
    Quit,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
            TerminationSignal::Quit => f.write_str("SIGQUIT"),
        }
    }
}

/// What a second termination signal does while draining is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecondSignalPolicy {
    /// Abandon the drain and exit immediately
    ForceExit,
    /// Keep draining until the deadline
    Ignore,
}

/// Stream of termination requests delivered to the process.
pub struct TerminationSignals {
    rx: mpsc::UnboundedReceiver<TerminationSignal>,
}

impl TerminationSignals {
    /// Install OS handlers for SIGINT, SIGTERM and SIGQUIT (Ctrl-C elsewhere).
    ///
    /// Handlers stay installed for the life of the process, so the default
    /// terminate-on-signal behaviour no longer applies once this returns.
    pub fn install() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let kinds = [
                (SignalKind::interrupt(), TerminationSignal::Interrupt),
                (SignalKind::terminate(), TerminationSignal::Terminate),
                (SignalKind::quit(), TerminationSignal::Quit),
            ];
            for (kind, which) in kinds {
                let mut stream = signal(kind).map_err(DemoError::SignalError)?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        if tx.send(which).is_err() {
                            break;
                        }
                    }
                });
            }
        }

        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if tx.send(TerminationSignal::Interrupt).is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Self { rx })
    }

    /// Signals fed by hand, for driving the coordinator without the OS.
    pub fn channel() -> (mpsc::UnboundedSender<TerminationSignal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next signal. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        self.rx.recv().await
    }
}
