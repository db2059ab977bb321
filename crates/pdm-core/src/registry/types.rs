//! Types used by the job registry.

use std::path::PathBuf;

/// Job identifier. Monotonic: a newer job for the same content always has
/// a larger id.
pub type JobId = i64;

/// Tag carried by every download job record.
pub const DOWNLOAD_TAG: &str = "download";

/// Job state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Unknown strings map to `Failed` so a corrupt row is never treated as live.
    pub fn from_db(s: &str) -> Self {
        match s {
            "pending" => JobState::Pending,
            "running" => JobState::Running,
            "succeeded" => JobState::Succeeded,
            "failed" => JobState::Failed,
            "cancelled" => JobState::Cancelled,
            _ => JobState::Failed,
        }
    }

    /// Pending or Running.
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }

    /// States announced exactly once per job to event subscribers.
    pub fn is_terminal_event(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// External status string.
    pub fn status_label(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
        }
    }

    /// Selection priority among records of one content id (lower wins).
    pub fn priority(self) -> u8 {
        match self {
            JobState::Running => 0,
            JobState::Pending => 1,
            JobState::Succeeded => 2,
            JobState::Failed => 3,
            JobState::Cancelled => 4,
        }
    }
}

impl serde::Serialize for JobState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.status_label())
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.status_label())
    }
}

/// One registry row.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub content_id: String,
    pub tag: String,
    pub state: JobState,
    pub attempt: u32,
    pub downloaded_count: usize,
    pub total_count: usize,
    pub downloaded_bytes: u64,
    pub destination: PathBuf,
    /// The admitted request (without cookies) as JSON.
    pub request_json: String,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Progress reported by the worker after each page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub content_id: String,
    pub downloaded_count: usize,
    pub total_count: usize,
    pub downloaded_bytes: u64,
    pub progress_percent: u8,
}

impl ProgressSnapshot {
    pub fn new(content_id: &str, downloaded_count: usize, total_count: usize, downloaded_bytes: u64) -> Self {
        let progress_percent = if total_count == 0 {
            0
        } else {
            ((downloaded_count as f64 / total_count as f64) * 100.0).round().min(100.0) as u8
        };
        Self {
            content_id: content_id.to_string(),
            downloaded_count,
            total_count,
            downloaded_bytes,
            progress_percent,
        }
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub job_id: JobId,
    pub state: JobState,
    pub downloaded_count: usize,
    pub total_count: usize,
}

impl From<&JobRecord> for StatusSnapshot {
    fn from(r: &JobRecord) -> Self {
        Self {
            job_id: r.id,
            state: r.state,
            downloaded_count: r.downloaded_count,
            total_count: r.total_count,
        }
    }
}

/// Pick the authoritative record: Running > Pending > Succeeded > Failed >
/// Cancelled; ties go to the earliest record in `records` (callers pass
/// newest first).
pub fn select_preferred<'a, I>(records: I) -> Option<&'a JobRecord>
where
    I: IntoIterator<Item = &'a JobRecord>,
{
    records.into_iter().min_by_key(|r| r.state.priority())
}
