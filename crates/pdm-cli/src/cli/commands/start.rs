//! `pdm start` – download a content in the foreground.
//!
//! Prints one line per progress event until the job finishes. Ctrl-C pauses
//! the job; running `start` again with the same arguments resumes it,
//! skipping pages already on disk.

use anyhow::{bail, Context, Result};
use clap::Args;
use pdm_core::events::ProgressEvent;
use pdm_core::registry::{JobId, JobState};
use pdm_core::request::DownloadRequest;
use pdm_core::DownloadManager;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    /// Content identifier.
    pub content_id: String,

    /// Page URLs, in page order.
    pub urls: Vec<String>,

    /// Logical source of the content (used in the directory layout).
    #[arg(long, default_value = "unknown")]
    pub source: String,

    /// JSON file with the page URLs (used when no URLs are given). Removed after success.
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// Content directory (default: derived from the storage root).
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Cookie to send to the configured cookie domain. Repeatable.
    #[arg(long = "cookie", value_name = "NAME=VALUE", value_parser = parse_cookie)]
    pub cookies: Vec<(String, String)>,

    #[arg(long)]
    pub title: Option<String>,

    /// Origin page URL recorded in metadata.json.
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub cover_url: Option<String>,

    #[arg(long)]
    pub language: Option<String>,
}

pub(crate) fn parse_cookie(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("cookie name is empty in `{s}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl StartArgs {
    pub fn into_request(self) -> DownloadRequest {
        let mut request = DownloadRequest::new(self.content_id, self.urls);
        request.source_id = self.source;
        request.urls_file = self.urls_file;
        request.destination = self.dest;
        request.cookies = self.cookies.into_iter().collect();
        if let Some(title) = self.title {
            request.metadata.title = title;
        }
        if let Some(url) = self.url {
            request.metadata.url = url;
        }
        if let Some(cover) = self.cover_url {
            request.metadata.cover_url = cover;
        }
        if let Some(language) = self.language {
            request.metadata.language = language;
        }
        request
    }
}

pub async fn run_start(manager: &DownloadManager, args: StartArgs) -> Result<()> {
    let request = args.into_request();
    let content_id = request.content_id.clone();

    let job_id = manager.start_download(request).await.context("start download")?;
    println!("Started {} (job {}).", content_id, job_id);

    // Subscribe only after admission has rebound the event state to this
    // job, so records from earlier runs are never reported.
    let mut sub = manager.subscribe();
    let outcome = follow(manager, &content_id, job_id, &mut sub.events).await;
    manager.unsubscribe(sub.id);
    outcome
}

async fn follow(
    manager: &DownloadManager,
    content_id: &str,
    job_id: JobId,
    events: &mut mpsc::Receiver<ProgressEvent>,
) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("event stream closed");
                };
                if event.content_id != content_id {
                    continue;
                }
                println!("{}", format_event(&event));
                match event.status {
                    JobState::Succeeded => {
                        if let Some(dir) = manager.download_path(content_id).await? {
                            println!("Saved to {}", dir.display());
                        }
                        return Ok(());
                    }
                    JobState::Failed => {
                        let reason = manager
                            .registry()
                            .get_job(job_id)
                            .await?
                            .and_then(|r| r.error)
                            .unwrap_or_else(|| "unknown error".to_string());
                        bail!("download of {} failed: {}", content_id, reason);
                    }
                    JobState::Cancelled => {
                        println!("Stopped {}. Run start again to resume.", content_id);
                        return Ok(());
                    }
                    JobState::Pending | JobState::Running => {}
                }
            }
            res = &mut ctrl_c => {
                res.context("listen for Ctrl-C")?;
                println!("Pausing {}...", content_id);
                manager.pause_download(content_id).await?;
                wait_until_stopped(manager, content_id).await?;
                println!("Paused {}. Run start again to resume.", content_id);
                return Ok(());
            }
        }
    }
}

/// The worker stops at the next page boundary; wait for that so the process
/// does not exit mid-page.
async fn wait_until_stopped(manager: &DownloadManager, content_id: &str) -> Result<()> {
    loop {
        match manager.download_status(content_id).await? {
            Some(s) if s.state.is_active() => {}
            _ => return Ok(()),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

pub(crate) fn format_event(event: &ProgressEvent) -> String {
    format!(
        "{:<12} {:<10} {:>5}/{:<5} {}",
        event.content_id,
        event.status,
        event.downloaded_pages,
        event.total_pages,
        format_rate(event.download_speed)
    )
}

pub(crate) fn format_rate(bytes_per_sec: u64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut value = bytes_per_sec as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes_per_sec, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
