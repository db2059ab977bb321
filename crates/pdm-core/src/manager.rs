//! `DownloadManager`: the library entry point tying scheduler, registry,
//! event hub and on-disk layout together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::PdmConfig;
use crate::error::Result;
use crate::events::{Aggregator, EventHub, Subscription, SubscriptionId};
use crate::layout::StorageRoots;
use crate::registry::{JobId, Registry, StatusSnapshot};
use crate::request::DownloadRequest;
use crate::scheduler::Scheduler;
use crate::storage;

pub struct DownloadManager {
    scheduler: Scheduler,
    hub: EventHub,
}

impl DownloadManager {
    /// Open the default registry, recover records orphaned by a previous
    /// process, and build a manager. Must be called within a tokio runtime.
    pub async fn open(cfg: PdmConfig) -> Result<Self> {
        let registry = Registry::open_default().await?;
        let recovered = registry.recover_interrupted().await?;
        if recovered > 0 {
            tracing::info!(recovered, "marked interrupted jobs cancelled");
        }
        Ok(Self::with_registry(cfg, registry))
    }

    pub fn with_registry(cfg: PdmConfig, registry: Registry) -> Self {
        let aggregator = Arc::new(Aggregator::new());
        let hub = EventHub::new(
            registry.clone(),
            Arc::clone(&aggregator),
            cfg.poll_interval(),
            cfg.subscriber_buffer,
        );
        let scheduler = Scheduler::new(cfg, registry, aggregator);
        Self { scheduler, hub }
    }

    pub fn registry(&self) -> &Registry {
        self.scheduler.registry()
    }

    pub fn roots(&self) -> &StorageRoots {
        self.scheduler.roots()
    }

    pub async fn start_download(&self, request: DownloadRequest) -> Result<JobId> {
        self.scheduler.enqueue(request).await
    }

    pub async fn cancel_download(&self, content_id: &str) -> Result<()> {
        self.scheduler.cancel(content_id).await
    }

    pub async fn pause_download(&self, content_id: &str) -> Result<()> {
        self.scheduler.pause(content_id).await
    }

    pub async fn download_status(&self, content_id: &str) -> Result<Option<StatusSnapshot>> {
        self.scheduler.status(content_id).await
    }

    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.hub.unsubscribe(id)
    }

    pub fn set_online(&self, online: bool) {
        self.scheduler.set_online(online)
    }

    /// Content directory for `content_id`: the destination of its newest job
    /// when that still exists, else the first match across storage roots and
    /// layouts.
    pub async fn download_path(&self, content_id: &str) -> Result<Option<PathBuf>> {
        if let Some(dest) = self.registry().latest_destination(content_id).await? {
            if dest.is_dir() {
                return Ok(Some(dest));
            }
        }
        Ok(self.roots().locate(content_id))
    }

    /// Page image files, sorted by name. Empty when nothing is on disk.
    pub async fn list_downloaded_files(&self, content_id: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .download_path(content_id)
            .await?
            .map(|dir| storage::list_page_files(&dir))
            .unwrap_or_default())
    }

    pub async fn count_downloaded_files(&self, content_id: &str) -> Result<usize> {
        Ok(self.list_downloaded_files(content_id).await?.len())
    }

    /// Delete the content directory (`explicit_path` when given, else the
    /// resolved one). Returns false when nothing was found or residue remains.
    pub async fn delete_downloaded_content(
        &self,
        content_id: &str,
        explicit_path: Option<&Path>,
    ) -> Result<bool> {
        let dir = match explicit_path {
            Some(p) => Some(p.to_path_buf()),
            None => self.download_path(content_id).await?,
        };
        let Some(dir) = dir else {
            tracing::debug!(content_id, "nothing to delete");
            return Ok(false);
        };
        let removed = tokio::task::spawn_blocking({
            let dir = dir.clone();
            move || storage::delete_content_dir(&dir)
        })
        .await
        .map_err(|e| crate::error::PdmError::Internal(format!("delete task join: {e}")))?;
        tracing::info!(content_id, dir = %dir.display(), removed, "content deleted");
        Ok(removed)
    }
}
