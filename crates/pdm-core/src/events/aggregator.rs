//! Turns registry observations into a deduplicated event stream.
//!
//! Per content id the aggregator remembers the last emitted fingerprint
//! `(state, 5% bucket, total)`, whether the current job's terminal state was
//! already announced, and the last `(bytes, millis)` sample for speed.
//! `reset` binds an id to a new job id; older records for that id are
//! ignored from then on.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::registry::{select_preferred, JobId, JobRecord, JobState};

use super::ProgressEvent;

/// Progress bucket width in percent.
const BUCKET: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    state: JobState,
    bucket: usize,
    total: usize,
}

impl Fingerprint {
    fn of(state: JobState, downloaded: usize, total: usize) -> Self {
        let percent = if total == 0 { 0 } else { downloaded.min(total) * 100 / total };
        Self {
            state,
            bucket: percent / BUCKET * BUCKET,
            total,
        }
    }
}

#[derive(Debug, Default)]
struct IdState {
    min_job_id: JobId,
    last: Option<Fingerprint>,
    terminal_emitted: bool,
    sample: Option<(u64, u64)>,
    /// A record for this id has been observed since the last reset.
    seen: bool,
}

impl IdState {
    fn speed(&mut self, bytes: u64, now_millis: u64) -> u64 {
        let speed = match self.sample {
            Some((prev_bytes, prev_millis)) if now_millis > prev_millis && bytes >= prev_bytes => {
                (bytes - prev_bytes) * 1000 / (now_millis - prev_millis)
            }
            _ => 0,
        };
        if bytes > 0 {
            self.sample = Some((bytes, now_millis));
        }
        speed
    }

    /// Record the observation and decide whether it is worth announcing.
    fn should_emit(&mut self, fp: Fingerprint) -> bool {
        if fp.state.is_terminal_event() {
            if self.terminal_emitted {
                return false;
            }
            self.terminal_emitted = true;
            self.last = Some(fp);
            return true;
        }
        // No page count yet: nothing to show.
        if fp.total == 0 {
            return false;
        }
        match self.last {
            Some(last) if last == fp => return false,
            // Same job state, lower bucket: a retry re-reporting from page 1.
            Some(last) if last.state == fp.state && last.total == fp.total && fp.bucket < last.bucket => {
                return false;
            }
            _ => {}
        }
        self.last = Some(fp);
        true
    }
}

/// Dedup caches keyed by content id. Shared between the poll loop and the
/// scheduler (which calls `reset` on enqueue).
#[derive(Debug, Default)]
pub struct Aggregator {
    ids: Mutex<HashMap<String, IdState>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a clean slate for `content_id`, considering only records with
    /// id >= `job_id`.
    pub fn reset(&self, content_id: &str, job_id: JobId) {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.insert(
            content_id.to_string(),
            IdState {
                min_job_id: job_id,
                ..IdState::default()
            },
        );
    }

    /// One poll cycle. `records` should be newest first (as the registry
    /// returns them); `now_millis` comes from a monotonic clock.
    pub fn process(&self, records: &[JobRecord], now_millis: u64) -> Vec<ProgressEvent> {
        let mut by_content: BTreeMap<&str, Vec<&JobRecord>> = BTreeMap::new();
        for r in records {
            by_content.entry(r.content_id.as_str()).or_default().push(r);
        }

        let present: HashSet<&str> = by_content.keys().copied().collect();

        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        let mut events = Vec::new();
        for (content_id, group) in by_content {
            let id_state = ids.entry(content_id.to_string()).or_default();
            let min_job_id = id_state.min_job_id;
            let Some(record) = select_preferred(group.into_iter().filter(|r| r.id >= min_job_id)) else {
                continue;
            };
            id_state.seen = true;

            let speed = id_state.speed(record.downloaded_bytes, now_millis);
            let fp = Fingerprint::of(record.state, record.downloaded_count, record.total_count);
            if !id_state.should_emit(fp) {
                continue;
            }
            tracing::trace!(content_id, job_id = record.id, state = %record.state, "emitting event");
            events.push(ProgressEvent {
                content_id: content_id.to_string(),
                downloaded_pages: record.downloaded_count,
                total_pages: record.total_count,
                status: record.state,
                download_speed: speed,
            });
        }
        // Ids whose records were removed (e.g. pruned). An id reset but not
        // yet observed is kept: its new record may not be in this snapshot.
        ids.retain(|id, st| !st.seen || present.contains(id.as_str()));
        events
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
