//! Global job budget shared across content ids.
//!
//! Each execution holds one permit while it transfers, so at most
//! `max_concurrent_jobs` jobs run at once; the rest stay `Pending` until a
//! permit frees up.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{PdmError, Result};

#[derive(Debug, Clone)]
pub struct JobBudget {
    max_total: usize,
    permits: Arc<Semaphore>,
}

impl JobBudget {
    /// Create a budget with the given maximum concurrent jobs (e.g. from config).
    pub fn new(max_total: usize) -> Self {
        let max_total = max_total.max(1);
        Self {
            max_total,
            permits: Arc::new(Semaphore::new(max_total)),
        }
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }

    /// Jobs currently holding a permit.
    pub fn in_use(&self) -> usize {
        self.max_total - self.permits.available_permits()
    }

    /// Wait for a free slot. The slot is released when the permit is dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PdmError::Internal("job budget closed".into()))
    }
}
