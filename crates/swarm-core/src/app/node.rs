//! SwarmNode - a worker loop running on its own tokio task.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::worker_loop::WorkerLoop;

/// A configured node, not yet running.
pub struct SwarmNode {
    worker: Arc<WorkerLoop>,
}

impl SwarmNode {
    pub fn new(worker: WorkerLoop) -> Self {
        Self {
            worker: Arc::new(worker),
        }
    }

    pub fn worker(&self) -> &WorkerLoop {
        &self.worker
    }

    /// Profile text advertised on start: description plus registry tags.
    pub fn profile_description(&self) -> String {
        let tags = self.worker.registry().tags().join(", ");
        format!("{}\n\nSkills: {tags}", self.worker.settings().description)
    }

    /// Advertise the profile, then spawn the loop.
    ///
    /// A failed profile update is logged and does not keep the loop from starting.
    pub async fn start(self) -> NodeHandle {
        let description = self.profile_description();
        if let Err(e) = self.worker.platform().update_profile(&description).await {
            warn!(error = %e, "failed to update profile");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Arc::clone(&self.worker);
        let join = tokio::spawn(async move {
            worker.run(shutdown_rx).await;
        });

        NodeHandle { shutdown_tx, join }
    }
}

/// Running node handle.
/// - `stop()` keeps new iterations from starting; the current one finishes
/// - dropping the handle stops the loop as well
pub struct NodeHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl NodeHandle {
    pub fn stop(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
        info!("node stop requested");
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown_and_join(self) {
        self.stop();
        let _ = self.join.await;
        info!("node stopped");
    }
}
