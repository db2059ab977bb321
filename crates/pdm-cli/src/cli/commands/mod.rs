//! CLI command handlers. Each command group is in its own file.

mod completions;
mod content;
mod jobs;
mod start;

pub use completions::{run_completions, run_man};
pub use content::{run_count, run_delete, run_files, run_path, run_status};
pub use jobs::{run_jobs, run_prune};
pub use start::{run_start, StartArgs};
#[cfg(test)]
pub(crate) use start::{format_event, format_rate};
