//! Job read operations.

use std::path::PathBuf;

use crate::error::Result;

use super::super::db::Registry;
use super::super::types::{JobId, JobRecord};
use super::{record_from_row, SELECT_COLUMNS};

impl Registry {
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// All records for `content_id`, newest first.
    pub async fn jobs_for_content(&self, content_id: &str) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE content_id = ?1 ORDER BY id DESC"))
            .bind(content_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// All records carrying `tag`, newest first.
    pub async fn jobs_by_tag(&self, tag: &str) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE tag = ?1 ORDER BY id DESC"))
            .bind(tag)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// List all jobs in the registry, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Destination of the newest record for `content_id`.
    pub async fn latest_destination(&self, content_id: &str) -> Result<Option<PathBuf>> {
        let dest: Option<String> = sqlx::query_scalar(
            r#"
            SELECT destination FROM jobs
            WHERE content_id = ?1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dest.map(PathBuf::from))
    }
}
