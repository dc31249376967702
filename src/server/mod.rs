pub mod api;

use axum::{Router, routing::get};
use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::shutdown::{ShutdownContext, ShutdownTask};
use crate::{DemoError, Result};

pub const SERVER_TASK: &str = "request-server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub work_delay: api::WorkDelay,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            work_delay: api::WorkDelay::default(),
        }
    }
}

/// Build the demo router
pub fn router(state: api::AppState) -> Router {
    Router::new()
        .route("/", get(api::demo))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The HTTP server, running on its own task once started.
pub struct RequestServer {
    local_addr: SocketAddr,
    stop: CancellationToken,
    task: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl RequestServer {
    /// Bind `addr` and start serving. Returns as soon as the listener is up.
    pub async fn start(addr: SocketAddr, app: Router) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Self::serve(listener, app)
    }

    /// Start serving on an already bound listener.
    pub fn serve(listener: TcpListener, app: Router) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        let stop = CancellationToken::new();
        let signal = stop.clone().cancelled_owned();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });

        tracing::info!(port = local_addr.port(), "Server is running on http://{}", local_addr);

        Ok(Self {
            local_addr,
            stop,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for in-flight requests, bounded by `ctx`.
    ///
    /// The serve task is aborted if it is still draining at the deadline.
    pub async fn shutdown(&self, ctx: &ShutdownContext) -> Result<()> {
        self.stop.cancel();

        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut task) = task else {
            return Ok(());
        };

        let result = ctx
            .run(SERVER_TASK, async {
                match (&mut task).await {
                    Ok(served) => served.map_err(DemoError::from),
                    Err(e) => Err(DemoError::ShutdownFailed {
                        task: SERVER_TASK.to_string(),
                        reason: e.to_string(),
                    }),
                }
            })
            .await;

        if result.is_err() {
            task.abort();
        }
        result
    }
}

impl ShutdownTask for RequestServer {
    fn name(&self) -> &'static str {
        SERVER_TASK
    }

    fn run<'a>(&'a self, ctx: &'a ShutdownContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.shutdown(ctx))
    }
}
