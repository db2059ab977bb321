//! `pdm jobs` and `pdm prune` – inspect and trim the job registry.

use anyhow::Result;
use pdm_core::DownloadManager;

pub async fn run_jobs(manager: &DownloadManager) -> Result<()> {
    let jobs = manager.registry().list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs in registry.");
    } else {
        println!(
            "{:<6} {:<10} {:<9} {:<7} {:<12} {}",
            "ID", "STATE", "PAGES", "ATTEMPT", "CONTENT", "ERROR"
        );
        for j in jobs {
            println!(
                "{:<6} {:<10} {:<9} {:<7} {:<12} {}",
                j.id,
                j.state,
                format!("{}/{}", j.downloaded_count, j.total_count),
                j.attempt,
                j.content_id,
                j.error.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

pub async fn run_prune(manager: &DownloadManager) -> Result<()> {
    let removed = manager.registry().prune_finished().await?;
    println!("Removed {} finished job record(s).", removed);
    Ok(())
}
