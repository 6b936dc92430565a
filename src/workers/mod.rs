pub mod janitor;

pub use janitor::Janitor;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A long-running background task that stops when cancelled.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, cancel: CancellationToken);
}

/// Spawns workers and tears them down together on shutdown.
pub struct WorkerManager {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerManager {
    pub fn new() -> Self {
        WorkerManager {
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    pub fn spawn(&mut self, worker: Box<dyn Worker>) {
        let name = worker.name();
        let cancel = self.cancel.clone();
        info!(worker = name, "starting worker");
        self.handles.push(tokio::spawn(async move {
            worker.run(cancel).await;
            info!(worker = name, "worker stopped");
        }));
    }

    /// Cancel every worker and wait for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked");
            }
        }
    }
}
