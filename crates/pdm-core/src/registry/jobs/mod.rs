//! Job CRUD: read and write operations on the `jobs` table.

mod read;
mod write;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;

use super::types::{JobRecord, JobState};

const SELECT_COLUMNS: &str = r#"
    SELECT id, content_id, tag, state, attempt, downloaded_count, total_count,
           downloaded_bytes, destination, request_json, error, created_at, updated_at
    FROM jobs
"#;

fn record_from_row(row: &SqliteRow) -> JobRecord {
    let state: String = row.get("state");
    let destination: String = row.get("destination");
    JobRecord {
        id: row.get("id"),
        content_id: row.get("content_id"),
        tag: row.get("tag"),
        state: JobState::from_db(&state),
        attempt: row.get::<i64, _>("attempt").max(0) as u32,
        downloaded_count: row.get::<i64, _>("downloaded_count").max(0) as usize,
        total_count: row.get::<i64, _>("total_count").max(0) as usize,
        downloaded_bytes: row.get::<i64, _>("downloaded_bytes").max(0) as u64,
        destination: PathBuf::from(destination),
        request_json: row.get("request_json"),
        error: row.get("error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
