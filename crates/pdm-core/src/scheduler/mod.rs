//! Job admission and execution.
//!
//! `enqueue` validates a request, supersedes any active job for the same
//! content id under a per-id lock, persists a `Pending` record and spawns the
//! execution task. Executions wait for the previous job of the same id to
//! stop, for the network gate and for a budget slot before fetching.

mod budget;
mod execute;
mod gate;
mod locks;

pub use budget::JobBudget;
pub use gate::NetworkGate;
pub use locks::KeyedLocks;

use std::sync::Arc;

use crate::config::PdmConfig;
use crate::control::JobControl;
use crate::error::{PdmError, Result};
use crate::events::Aggregator;
use crate::layout::StorageRoots;
use crate::registry::{select_preferred, JobId, Registry, StatusSnapshot, DOWNLOAD_TAG};
use crate::request::DownloadRequest;
use crate::retry::RetryPolicy;

pub(crate) struct Inner {
    cfg: PdmConfig,
    registry: Registry,
    control: JobControl,
    roots: StorageRoots,
    aggregator: Arc<Aggregator>,
    gate: NetworkGate,
    budget: JobBudget,
    admission: KeyedLocks,
    execution: KeyedLocks,
    retry: RetryPolicy,
}

/// Cheap to clone; clones share the same jobs.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(cfg: PdmConfig, registry: Registry, aggregator: Arc<Aggregator>) -> Self {
        let roots = StorageRoots::from_config(&cfg);
        let budget = JobBudget::new(cfg.max_concurrent_jobs);
        let retry = RetryPolicy::from_config(&cfg.retry);
        Self {
            inner: Arc::new(Inner {
                cfg,
                registry,
                control: JobControl::new(),
                roots,
                aggregator,
                gate: NetworkGate::new(true),
                budget,
                admission: KeyedLocks::new(),
                execution: KeyedLocks::new(),
                retry,
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn roots(&self) -> &StorageRoots {
        &self.inner.roots
    }

    /// Admit `request` and start it in the background. Returns the new job id.
    ///
    /// Fails synchronously only for invalid requests (or if the registry is
    /// unreachable); everything after admission is reported through job state.
    pub async fn enqueue(&self, mut request: DownloadRequest) -> Result<JobId> {
        request.resolve_urls()?;
        if request.destination.is_none() {
            request.destination = self
                .inner
                .roots
                .derive(&request.source_id, &request.content_id);
        }
        request.validate()?;
        let destination = request
            .destination
            .clone()
            .ok_or_else(|| PdmError::Validation("destination path is required".into()))?;
        let content_id = request.content_id.clone();
        let inner = &self.inner;

        let _admission = inner.admission.lock(&content_id).await;

        if let Some(previous) = inner.control.request_abort(&content_id) {
            tracing::info!(content_id = %content_id, job_id = previous, "superseding running job");
        }
        let superseded = inner.registry.supersede_active(&content_id).await?;
        let request_json = serde_json::to_string(&request)?;
        let job_id = inner
            .registry
            .insert_job(
                &content_id,
                DOWNLOAD_TAG,
                request.resource_urls.len(),
                &destination,
                &request_json,
            )
            .await?;
        inner.aggregator.reset(&content_id, job_id);
        let abort = inner.control.register(&content_id, job_id);

        tracing::info!(
            content_id = %content_id,
            job_id,
            pages = request.resource_urls.len(),
            superseded,
            dest = %destination.display(),
            "download enqueued"
        );
        tokio::spawn(execute::execute_job(Arc::clone(inner), job_id, request, abort));
        Ok(job_id)
    }

    /// Stop the job for `content_id` at its next page boundary and cancel
    /// any record that has not started yet. Files on disk stay.
    pub async fn cancel(&self, content_id: &str) -> Result<()> {
        let signalled = self.inner.control.request_abort(content_id);
        let pending = self.inner.registry.cancel_pending(content_id).await?;
        tracing::info!(content_id, ?signalled, pending, "cancel requested");
        Ok(())
    }

    /// Same as [`Scheduler::cancel`]; resuming is a fresh enqueue that skips
    /// pages already on disk.
    pub async fn pause(&self, content_id: &str) -> Result<()> {
        self.cancel(content_id).await
    }

    pub async fn status(&self, content_id: &str) -> Result<Option<StatusSnapshot>> {
        let records = self.inner.registry.jobs_for_content(content_id).await?;
        Ok(select_preferred(&records).map(StatusSnapshot::from))
    }

    pub fn set_online(&self, online: bool) {
        tracing::info!(online, "network availability changed");
        self.inner.gate.set_online(online);
    }

    pub fn is_online(&self) -> bool {
        self.inner.gate.is_online()
    }

    /// Jobs currently holding a transfer slot.
    pub fn running_jobs(&self) -> usize {
        self.inner.budget.in_use()
    }
}
