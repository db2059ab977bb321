//! Durable job registry (SQLite via sqlx).
//!
//! Every enqueued download gets a row tagged `download`. Rows are never
//! rewritten into a new job: superseded and finished records stay as history
//! until pruned, and the event poller reads them all by tag.

pub mod types;
pub mod db;
mod jobs;

pub use types::*;
pub use db::*;

#[cfg(test)]
mod tests;
