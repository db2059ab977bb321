//! SQLite-backed job registry implementation.
//!
//! Handles connection, migrations, and timestamp helpers. Job CRUD lives in `jobs`.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{PdmError, Result};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed job registry.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/pdm/jobs.db` on Debian.
#[derive(Clone)]
pub struct Registry {
    pub(crate) pool: Pool<Sqlite>,
}

impl Registry {
    /// Open (or create) the default registry and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("pdm")
            .map_err(|e| PdmError::fs("locate XDG state dir", io::Error::new(io::ErrorKind::NotFound, e)))?;
        Self::open_at(xdg_dirs.get_state_home().join("jobs.db")).await
    }

    /// Open (or create) the registry at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PdmError::fs(format!("create {}", parent.display()), e))?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let db = Registry { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // AUTOINCREMENT keeps ids monotonic even after pruning; the event
        // poller relies on that to tell current jobs from superseded ones.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id TEXT NOT NULL,
                tag TEXT NOT NULL,
                state TEXT NOT NULL,
                attempt INTEGER NOT NULL DEFAULT 0,
                downloaded_count INTEGER NOT NULL DEFAULT 0,
                total_count INTEGER NOT NULL DEFAULT 0,
                downloaded_bytes INTEGER NOT NULL DEFAULT 0,
                destination TEXT NOT NULL,
                request_json TEXT NOT NULL,
                error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_content ON jobs (content_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Current time as Unix seconds (for DB timestamps). Pub for use by `jobs`.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory registry for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<Registry> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = Registry { pool };
    db.migrate().await?;
    Ok(db)
}
