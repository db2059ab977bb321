//! Per-content commands: `status`, `files`, `path`, `count`, `delete`.

use anyhow::Result;
use pdm_core::DownloadManager;
use std::path::Path;

pub async fn run_status(manager: &DownloadManager, content_id: &str) -> Result<()> {
    match manager.download_status(content_id).await? {
        Some(s) => println!(
            "{} {} {}/{} (job {})",
            content_id, s.state, s.downloaded_count, s.total_count, s.job_id
        ),
        None => println!("No download found for {}.", content_id),
    }
    Ok(())
}

pub async fn run_files(manager: &DownloadManager, content_id: &str) -> Result<()> {
    for file in manager.list_downloaded_files(content_id).await? {
        println!("{}", file.display());
    }
    Ok(())
}

pub async fn run_path(manager: &DownloadManager, content_id: &str) -> Result<()> {
    match manager.download_path(content_id).await? {
        Some(dir) => println!("{}", dir.display()),
        None => println!("No download found for {}.", content_id),
    }
    Ok(())
}

pub async fn run_count(manager: &DownloadManager, content_id: &str) -> Result<()> {
    println!("{}", manager.count_downloaded_files(content_id).await?);
    Ok(())
}

pub async fn run_delete(manager: &DownloadManager, content_id: &str, path: Option<&Path>) -> Result<()> {
    if manager.delete_downloaded_content(content_id, path).await? {
        println!("Deleted {}.", content_id);
    } else {
        println!("Nothing deleted for {}.", content_id);
    }
    Ok(())
}
