//! Download request: what to fetch, where to put it, and how to authenticate.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PdmError, Result};
use crate::layout::component_fits;

/// Descriptive fields copied into `metadata.json`; never used for control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMetadata {
    pub title: String,
    pub url: String,
    pub cover_url: String,
    pub language: String,
}

impl Default for ContentMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown".to_string(),
            url: String::new(),
            cover_url: String::new(),
            language: "unknown".to_string(),
        }
    }
}

/// One batch download. Stored as JSON in the job record; cookies are skipped
/// so credentials never reach the registry.
#[derive(Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub content_id: String,
    #[serde(default = "default_source_id")]
    pub source_id: String,
    /// Page URLs in page order.
    #[serde(default)]
    pub resource_urls: Vec<String>,
    /// JSON array of URLs, used when `resource_urls` is empty. Deleted after
    /// a successful download.
    #[serde(default)]
    pub urls_file: Option<PathBuf>,
    /// Content directory; derived from the storage roots when absent.
    #[serde(default)]
    pub destination: Option<PathBuf>,
    #[serde(skip)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: ContentMetadata,
}

fn default_source_id() -> String {
    "unknown".to_string()
}

impl std::fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("content_id", &self.content_id)
            .field("source_id", &self.source_id)
            .field("resource_urls", &self.resource_urls.len())
            .field("urls_file", &self.urls_file)
            .field("destination", &self.destination)
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl DownloadRequest {
    pub fn new(content_id: impl Into<String>, resource_urls: Vec<String>) -> Self {
        Self {
            content_id: content_id.into(),
            source_id: default_source_id(),
            resource_urls,
            urls_file: None,
            destination: None,
            cookies: BTreeMap::new(),
            metadata: ContentMetadata::default(),
        }
    }

    /// Load `resource_urls` from `urls_file` when the inline list is empty.
    pub fn resolve_urls(&mut self) -> Result<()> {
        if !self.resource_urls.is_empty() {
            return Ok(());
        }
        let Some(path) = &self.urls_file else {
            return Ok(());
        };
        let data = std::fs::read(path)
            .map_err(|e| PdmError::Validation(format!("cannot read urls file {}: {}", path.display(), e)))?;
        self.resource_urls = serde_json::from_slice(&data)
            .map_err(|e| PdmError::Validation(format!("urls file {} is not a JSON string array: {}", path.display(), e)))?;
        Ok(())
    }

    /// Admission checks: non-empty ids that fit a directory name, at least
    /// one non-blank URL, and a non-empty destination.
    pub fn validate(&self) -> Result<()> {
        if self.content_id.trim().is_empty() {
            return Err(PdmError::Validation("content_id is required".into()));
        }
        for (field, value) in [("content_id", &self.content_id), ("source_id", &self.source_id)] {
            if !component_fits(value) {
                return Err(PdmError::Validation(format!("{} is too long for a directory name", field)));
            }
        }
        if self.resource_urls.is_empty() {
            return Err(PdmError::Validation("resource_urls must not be empty".into()));
        }
        if let Some(i) = self.resource_urls.iter().position(|u| u.trim().is_empty()) {
            return Err(PdmError::Validation(format!("resource url #{} is blank", i + 1)));
        }
        match &self.destination {
            Some(d) if !d.as_os_str().is_empty() => Ok(()),
            _ => Err(PdmError::Validation("destination path is required".into())),
        }
    }
}
