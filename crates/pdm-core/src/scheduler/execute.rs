//! Execution of one admitted job: wait, run the worker with retries, record
//! the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::control::{is_aborted, AbortToken};
use crate::error::{PdmError, Result};
use crate::fetch::{CookieScope, Fetcher};
use crate::registry::{JobId, JobState};
use crate::request::DownloadRequest;
use crate::retry::{classify, RetryDecision};
use crate::worker::{run_download, run_progress_persistence_loop, WorkerContext, WorkerOutcome};

use super::Inner;

/// How often waits re-check the abort token.
const ABORT_POLL: Duration = Duration::from_millis(250);
const PROGRESS_CHANNEL: usize = 64;

/// Await `fut` unless the job is aborted first.
async fn unless_aborted<F: Future>(abort: &AbortToken, fut: F) -> Option<F::Output> {
    tokio::pin!(fut);
    loop {
        if is_aborted(abort) {
            return None;
        }
        tokio::select! {
            out = &mut fut => return Some(out),
            _ = tokio::time::sleep(ABORT_POLL) => {}
        }
    }
}

/// Task body spawned by `enqueue`. Never returns an error: failures end the
/// record as `Failed`.
pub(super) async fn execute_job(inner: Arc<Inner>, job_id: JobId, request: DownloadRequest, abort: AbortToken) {
    let content_id = request.content_id.clone();
    if let Err(e) = run_job(&inner, job_id, request, &abort).await {
        tracing::error!(content_id = %content_id, job_id, "download failed: {}", e);
        if let Err(db_err) = inner.registry.set_failed(job_id, &e.to_string()).await {
            tracing::warn!(job_id, "could not record failure: {}", db_err);
        }
    }
    inner.control.unregister(&content_id, job_id);
}

async fn mark_cancelled(inner: &Inner, job_id: JobId) -> Result<()> {
    inner.registry.set_state_if_active(job_id, JobState::Cancelled).await?;
    tracing::info!(job_id, "job cancelled");
    Ok(())
}

async fn run_job(inner: &Inner, job_id: JobId, request: DownloadRequest, abort: &AbortToken) -> Result<()> {
    let content_id = request.content_id.as_str();

    // A superseded job for the same id may still be between pages.
    let Some(_exec) = unless_aborted(abort, inner.execution.lock(content_id)).await else {
        return mark_cancelled(inner, job_id).await;
    };
    if unless_aborted(abort, inner.gate.wait_online()).await.is_none() {
        return mark_cancelled(inner, job_id).await;
    }
    let Some(permit) = unless_aborted(abort, inner.budget.acquire()).await else {
        return mark_cancelled(inner, job_id).await;
    };
    let _permit = permit?;

    if !inner.registry.set_state_if_active(job_id, JobState::Running).await? {
        tracing::debug!(content_id, job_id, "job no longer active, not starting");
        return Ok(());
    }

    let fetcher = Fetcher::new(
        inner.cfg.http.clone(),
        CookieScope::new(inner.cfg.cookie_domain.clone(), request.cookies.clone()),
    );

    let mut attempt: u32 = 1;
    loop {
        inner.registry.set_attempt(job_id, attempt).await?;
        tracing::debug!(content_id, job_id, attempt, "worker starting");

        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL);
        let persist = tokio::spawn(run_progress_persistence_loop(
            progress_rx,
            inner.registry.clone(),
            job_id,
        ));
        let ctx = WorkerContext {
            job_id,
            request: request.clone(),
            fetcher: fetcher.clone(),
            abort: Arc::clone(abort),
            progress_tx,
        };
        let result = tokio::task::spawn_blocking(move || run_download(&ctx))
            .await
            .map_err(|e| PdmError::Internal(format!("worker task join: {e}")))
            .and_then(|r| r);
        // The worker's sender is gone; drain the remaining snapshots first.
        let _ = persist.await;

        match result {
            Ok(WorkerOutcome::Completed { pages, bytes }) => {
                inner.registry.finish_succeeded(job_id, pages, bytes).await?;
                tracing::info!(content_id, job_id, pages, bytes, "download completed");
                return Ok(());
            }
            Ok(WorkerOutcome::Cancelled { completed }) => {
                tracing::debug!(content_id, job_id, completed, "worker stopped early");
                return mark_cancelled(inner, job_id).await;
            }
            Err(e) => match inner.retry.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        content_id,
                        job_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying: {}",
                        e
                    );
                    if unless_aborted(abort, tokio::time::sleep(delay)).await.is_none() {
                        return mark_cancelled(inner, job_id).await;
                    }
                    attempt += 1;
                }
            },
        }
    }
}
