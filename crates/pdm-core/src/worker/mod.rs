//! Download worker: fetches one job's pages in order into
//! `<content_dir>/images`, skipping pages already on disk.
//!
//! Runs on the blocking pool (libcurl). Progress goes out through a bounded
//! channel with `try_send`; a full channel drops the update rather than
//! stalling the transfer.

mod progress;

pub use progress::run_progress_persistence_loop;

use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::control::{is_aborted, AbortToken};
use crate::error::{PdmError, Result};
use crate::fetch::Fetcher;
use crate::layout::{extension_for, page_file_name, IMAGES_DIR};
use crate::metadata::MetadataRecord;
use crate::registry::{JobId, ProgressSnapshot};
use crate::request::DownloadRequest;
use crate::storage;

/// Everything one execution needs.
pub struct WorkerContext {
    pub job_id: JobId,
    pub request: DownloadRequest,
    pub fetcher: Fetcher,
    pub abort: AbortToken,
    pub progress_tx: mpsc::Sender<ProgressSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Every page is on disk.
    Completed { pages: usize, bytes: u64 },
    /// Stopped at a page boundary by cancel, pause or supersede.
    Cancelled { completed: usize },
}

/// Run one execution of a job. Blocking; call from `spawn_blocking`.
pub fn run_download(ctx: &WorkerContext) -> Result<WorkerOutcome> {
    let request = &ctx.request;
    let content_id = request.content_id.as_str();
    let dir: PathBuf = request
        .destination
        .clone()
        .ok_or_else(|| PdmError::Validation("destination path is required".into()))?;
    let images = dir.join(IMAGES_DIR);
    storage::ensure_dir(&images)?;

    let total = request.resource_urls.len();
    let mut files = Vec::with_capacity(total);
    let mut bytes: u64 = 0;

    for (idx, url) in request.resource_urls.iter().enumerate() {
        let ordinal = idx + 1;
        if is_aborted(&ctx.abort) {
            tracing::info!(content_id, job_id = ctx.job_id, completed = idx, "download stopped");
            return Ok(WorkerOutcome::Cancelled { completed: idx });
        }

        let name = page_file_name(ordinal, &extension_for(url));
        let path = images.join(&name);
        let size = match storage::non_empty_len(&path) {
            Some(len) => {
                tracing::debug!(content_id, page = ordinal, "page already on disk, skipping");
                len
            }
            None => {
                let written = ctx.fetcher.fetch_to_file(url, &path)?;
                tracing::debug!(content_id, page = ordinal, bytes = written, "page fetched");
                storage::non_empty_len(&path).unwrap_or(written)
            }
        };
        bytes += size;
        files.push(name);

        let _ = ctx
            .progress_tx
            .try_send(ProgressSnapshot::new(content_id, ordinal, total, bytes));
    }

    finish_content(request, &dir, files);
    Ok(WorkerOutcome::Completed {
        pages: total,
        bytes,
    })
}

/// Post-download bookkeeping. Failures are logged; the pages are already
/// complete and the job still succeeds.
fn finish_content(request: &DownloadRequest, dir: &std::path::Path, files: Vec<String>) {
    let content_id = request.content_id.as_str();
    let record = MetadataRecord::for_download(request, files, Utc::now());
    if let Err(e) = record.write_to(dir) {
        tracing::warn!(content_id, "metadata write failed: {}", e);
    }
    if let Err(e) = storage::create_marker(dir) {
        tracing::warn!(content_id, "marker write failed: {}", e);
    }
    if let Some(list) = &request.urls_file {
        if let Err(e) = std::fs::remove_file(list) {
            tracing::warn!(content_id, path = %list.display(), "could not remove urls file: {}", e);
        }
    }
}
