#![allow(dead_code)]

pub mod page_server;

use std::path::{Path, PathBuf};
use std::time::Duration;

use pdm_core::config::{PdmConfig, RetryConfig};
use pdm_core::registry::{JobState, Registry, StatusSnapshot};
use pdm_core::request::DownloadRequest;
use pdm_core::DownloadManager;
use tempfile::TempDir;

/// A manager over a temp registry and a temp public storage root.
pub struct Harness {
    pub manager: DownloadManager,
    pub root: TempDir,
    _state: TempDir,
}

/// Config tuned for tests: fast polling, short retry backoff.
pub fn test_config(root: &Path) -> PdmConfig {
    PdmConfig {
        public_root: Some(root.to_path_buf()),
        poll_interval_ms: 20,
        retry: RetryConfig {
            max_attempts: 2,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        },
        ..PdmConfig::default()
    }
}

pub async fn harness_with(configure: impl FnOnce(&mut PdmConfig)) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let registry = Registry::open_at(state.path().join("jobs.db")).await.unwrap();
    let mut cfg = test_config(root.path());
    configure(&mut cfg);
    Harness {
        manager: DownloadManager::with_registry(cfg, registry),
        root,
        _state: state,
    }
}

pub async fn harness() -> Harness {
    harness_with(|_| {}).await
}

impl Harness {
    pub fn dest(&self, content_id: &str) -> PathBuf {
        self.root.path().join(content_id)
    }

    pub fn request(&self, content_id: &str, urls: Vec<String>) -> DownloadRequest {
        let mut r = DownloadRequest::new(content_id, urls);
        r.source_id = "src".into();
        r.destination = Some(self.dest(content_id));
        r
    }

    /// Poll status until `pred` holds; panics after 10 s.
    pub async fn wait_for(&self, content_id: &str, pred: impl Fn(&StatusSnapshot) -> bool) -> StatusSnapshot {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(s) = self.manager.download_status(content_id).await.unwrap() {
                if pred(&s) {
                    return s;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {content_id}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn wait_for_state(&self, content_id: &str, state: JobState) -> StatusSnapshot {
        self.wait_for(content_id, |s| s.state == state).await
    }
}

/// Wait (on a std thread-backed server) until `cond` holds; panics after 10 s.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
