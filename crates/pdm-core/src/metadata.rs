//! `metadata.json` record written into a content directory after a
//! successful download.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::METADATA_FILE;
use crate::request::DownloadRequest;
use crate::storage;

pub const SCHEMA_VERSION: &str = "2.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    pub source: String,
    pub content_id: String,
    pub title: String,
    pub url: String,
    pub download_date: String,
    pub total_pages: usize,
    pub downloaded_files: usize,
    pub files: Vec<String>,
    pub language: String,
    pub cover_url: String,
    pub is_range_download: bool,
    pub start_page: usize,
    pub end_page: usize,
    pub pages_downloaded: usize,
}

/// UTC timestamp with millisecond precision, e.g. `2026-01-02T03:04:05.678Z`.
pub fn format_download_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

impl MetadataRecord {
    /// Record for a full download of `request` whose pages are `files`
    /// (basenames, in page order).
    pub fn for_download(request: &DownloadRequest, files: Vec<String>, at: DateTime<Utc>) -> Self {
        let total = files.len();
        let meta = &request.metadata;
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            source: request.source_id.clone(),
            content_id: request.content_id.clone(),
            title: meta.title.clone(),
            url: meta.url.clone(),
            download_date: format_download_date(at),
            total_pages: total,
            downloaded_files: total,
            files,
            language: meta.language.clone(),
            cover_url: meta.cover_url.clone(),
            is_range_download: false,
            start_page: 1,
            end_page: total,
            pages_downloaded: total,
        }
    }

    /// Serialize as pretty JSON and write `<dir>/metadata.json` atomically.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        storage::write_atomic(&dir.join(METADATA_FILE), &json)
    }
}
