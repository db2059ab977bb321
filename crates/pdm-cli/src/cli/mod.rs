//! CLI for the PDM page download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use pdm_core::config;
use pdm_core::DownloadManager;
use std::path::PathBuf;

use commands::{
    run_completions, run_count, run_delete, run_files, run_jobs, run_man, run_path, run_prune,
    run_start, run_status, StartArgs,
};

/// Top-level CLI for the PDM download manager.
#[derive(Debug, Parser)]
#[command(name = "pdm")]
#[command(about = "PDM: resumable batch page downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a content's pages in the foreground, printing progress. Ctrl-C pauses.
    Start(StartArgs),

    /// Show the status of a content's download.
    Status {
        /// Content identifier.
        content_id: String,
    },

    /// List downloaded page files of a content.
    Files {
        /// Content identifier.
        content_id: String,
    },

    /// Print the directory holding a content.
    Path {
        /// Content identifier.
        content_id: String,
    },

    /// Count downloaded page files of a content.
    Count {
        /// Content identifier.
        content_id: String,
    },

    /// Delete a content's files from disk.
    Delete {
        /// Content identifier.
        content_id: String,
        /// Delete this directory instead of the resolved one.
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// List job records in the registry.
    Jobs,

    /// Remove finished job records, keeping the newest per content.
    Prune,

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell),
            CliCommand::Man => return run_man(),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let manager = DownloadManager::open(cfg).await?;

        match cli.command {
            CliCommand::Start(args) => run_start(&manager, args).await?,
            CliCommand::Status { content_id } => run_status(&manager, &content_id).await?,
            CliCommand::Files { content_id } => run_files(&manager, &content_id).await?,
            CliCommand::Path { content_id } => run_path(&manager, &content_id).await?,
            CliCommand::Count { content_id } => run_count(&manager, &content_id).await?,
            CliCommand::Delete { content_id, path } => {
                run_delete(&manager, &content_id, path.as_deref()).await?
            }
            CliCommand::Jobs => run_jobs(&manager).await?,
            CliCommand::Prune => run_prune(&manager).await?,
            CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
