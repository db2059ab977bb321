//! Job control for pause/cancel: shared abort tokens keyed by content id.
//!
//! The scheduler registers an abort token for every admitted job. Cancel,
//! pause and supersede set the token; the worker polls it at each page
//! boundary and stops there.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::registry::JobId;

/// Flag observed by a worker between pages.
pub type AbortToken = Arc<AtomicBool>;

pub fn is_aborted(token: &AbortToken) -> bool {
    token.load(Ordering::Relaxed)
}

/// Shared registry of content id -> (job id, abort token).
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<String, (JobId, AbortToken)>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the current job for `content_id`, replacing any older entry.
    /// Returns the token to hand to the worker.
    pub fn register(&self, content_id: &str, job_id: JobId) -> AbortToken {
        let token = Arc::new(AtomicBool::new(false));
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content_id.to_string(), (job_id, Arc::clone(&token)));
        token
    }

    /// Remove the entry for `content_id` if it still belongs to `job_id`.
    /// A newer job registered for the same id is left alone.
    pub fn unregister(&self, content_id: &str, job_id: JobId) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.get(content_id).is_some_and(|(id, _)| *id == job_id) {
            jobs.remove(content_id);
        }
    }

    /// Request abort for the job currently registered under `content_id`.
    /// Returns the job id that was signalled, if any.
    pub fn request_abort(&self, content_id: &str) -> Option<JobId> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(content_id).map(|(job_id, token)| {
            token.store(true, Ordering::Relaxed);
            *job_id
        })
    }

    pub fn is_registered(&self, content_id: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(content_id)
    }
}
