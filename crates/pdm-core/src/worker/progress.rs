//! Background task that persists worker progress snapshots to the registry.

use tokio::sync::mpsc;

use crate::registry::{JobId, ProgressSnapshot, Registry};

/// Receive snapshots until the worker drops its sender, persisting each one.
/// Spawn this with tokio::spawn alongside the blocking worker.
pub async fn run_progress_persistence_loop(
    mut progress_rx: mpsc::Receiver<ProgressSnapshot>,
    registry: Registry,
    job_id: JobId,
) {
    while let Some(snapshot) = progress_rx.recv().await {
        if let Err(e) = registry.update_progress(job_id, &snapshot).await {
            tracing::warn!(job_id, content_id = %snapshot.content_id, "durable progress update failed: {}", e);
        }
    }
}
