//! Job write operations: insert, supersede, state transitions, progress, prune.
//!
//! Transitions out of an active state are guarded in SQL (`state IN
//! ('pending','running')`), so a record that was already cancelled by a
//! supersede is never flipped back by a late worker update.

use std::path::Path;

use crate::error::Result;

use super::super::db::{unix_timestamp, Registry};
use super::super::types::{JobId, JobState, ProgressSnapshot};

impl Registry {
    /// Insert a new `Pending` record.
    pub async fn insert_job(
        &self,
        content_id: &str,
        tag: &str,
        total_count: usize,
        destination: &Path,
        request_json: &str,
    ) -> Result<JobId> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO jobs (
                content_id, tag, state, attempt, downloaded_count, total_count,
                downloaded_bytes, destination, request_json, error, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 0, 0, ?4, 0, ?5, ?6, NULL, ?7, ?7)
            "#,
        )
        .bind(content_id)
        .bind(tag)
        .bind(JobState::Pending.as_str())
        .bind(total_count as i64)
        .bind(destination.to_string_lossy().into_owned())
        .bind(request_json)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Mark every active record for `content_id` `Cancelled`. Returns how many changed.
    pub async fn supersede_active(&self, content_id: &str) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'cancelled', updated_at = ?1
            WHERE content_id = ?2 AND state IN ('pending', 'running')
            "#,
        )
        .bind(unix_timestamp())
        .bind(content_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Mark still-`Pending` records for `content_id` `Cancelled`.
    pub async fn cancel_pending(&self, content_id: &str) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'cancelled', updated_at = ?1
            WHERE content_id = ?2 AND state = 'pending'
            "#,
        )
        .bind(unix_timestamp())
        .bind(content_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Set `state` only while the record is still active. Returns false when
    /// the record was already finished or superseded.
    pub async fn set_state_if_active(&self, id: JobId, state: JobState) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?1, updated_at = ?2
            WHERE id = ?3 AND state IN ('pending', 'running')
            "#,
        )
        .bind(state.as_str())
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_attempt(&self, id: JobId, attempt: u32) -> Result<()> {
        sqlx::query("UPDATE jobs SET attempt = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(attempt as i64)
            .bind(unix_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Persist a worker progress snapshot while the record is active.
    /// Counts never decrease: a retried attempt re-reports skipped pages
    /// from page 1.
    pub async fn update_progress(&self, id: JobId, progress: &ProgressSnapshot) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET downloaded_count = MAX(downloaded_count, ?1),
                total_count = ?2,
                downloaded_bytes = MAX(downloaded_bytes, ?3),
                updated_at = ?4
            WHERE id = ?5 AND state IN ('pending', 'running')
            "#,
        )
        .bind(progress.downloaded_count as i64)
        .bind(progress.total_count as i64)
        .bind(progress.downloaded_bytes as i64)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Active → `Succeeded` with final counts.
    pub async fn finish_succeeded(&self, id: JobId, pages: usize, bytes: u64) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'succeeded', downloaded_count = ?1, total_count = ?1,
                downloaded_bytes = ?2, error = NULL, updated_at = ?3
            WHERE id = ?4 AND state IN ('pending', 'running')
            "#,
        )
        .bind(pages as i64)
        .bind(bytes as i64)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Active → `Failed` with the error text.
    pub async fn set_failed(&self, id: JobId, error: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'failed', error = ?1, updated_at = ?2
            WHERE id = ?3 AND state IN ('pending', 'running')
            "#,
        )
        .bind(error)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// On startup: records left `Pending`/`Running` by a previous process
    /// have no worker anymore. Mark them `Cancelled`; their pages resume on
    /// the next enqueue.
    pub async fn recover_interrupted(&self) -> Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'cancelled', updated_at = ?1
            WHERE state IN ('pending', 'running')
            "#,
        )
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Delete finished records, keeping the newest record of each content id.
    pub async fn prune_finished(&self) -> Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE state IN ('succeeded', 'failed', 'cancelled')
              AND id NOT IN (SELECT MAX(id) FROM jobs GROUP BY content_id)
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
