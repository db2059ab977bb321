//! On-disk layout of downloaded content.
//!
//! A content directory lives at `<root>/<folder>/<source>/<content>` and holds
//! `images/page_NNN.<ext>`, `metadata.json` and the `.nomedia` marker. Older
//! downloads may use `<root>/<folder>/<content>` or `<root>/<content>`; lookup
//! tries each `(root, layout)` pair in order.

mod sanitize;

pub use sanitize::{component_fits, escape_component};

use std::path::{Path, PathBuf};

use crate::config::PdmConfig;

pub const IMAGES_DIR: &str = "images";
pub const METADATA_FILE: &str = "metadata.json";
pub const MARKER_FILE: &str = ".nomedia";
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Extensions accepted from resource URLs and listed as downloaded pages.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "bmp"];

/// Canonical page filename for the 1-based ordinal `index`.
pub fn page_file_name(index: usize, ext: &str) -> String {
    format!("page_{index:03}.{ext}")
}

/// True when `ext` (case-insensitive) is a known image extension.
pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Page extension for a resource URL: the URL path's extension when it is a
/// known image type, else `jpg`.
pub fn extension_for(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return DEFAULT_EXTENSION.to_string();
    };
    parsed
        .path()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| is_image_extension(ext))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Directory convention under a storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `<root>/<folder>/<source>/<content>`
    Namespaced,
    /// `<root>/<folder>/<content>`
    LegacyFolder,
    /// `<root>/<content>`
    Flat,
}

impl Layout {
    pub const SEARCH_ORDER: [Layout; 3] = [Layout::Namespaced, Layout::LegacyFolder, Layout::Flat];
}

/// Ordered storage roots plus the namespace folder.
#[derive(Debug, Clone)]
pub struct StorageRoots {
    candidates: Vec<PathBuf>,
    folder: String,
}

impl StorageRoots {
    pub fn new(candidates: Vec<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            candidates,
            folder: escape_component(&folder.into()),
        }
    }

    /// Custom root first (when configured), then the public root.
    pub fn from_config(cfg: &PdmConfig) -> Self {
        let mut candidates = Vec::with_capacity(2);
        if let Some(custom) = &cfg.custom_storage_root {
            candidates.push(custom.clone());
        }
        let public = cfg.resolved_public_root();
        if !candidates.contains(&public) {
            candidates.push(public);
        }
        Self::new(candidates, cfg.backup_folder.clone())
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Default destination for new downloads: namespaced layout under the
    /// first root.
    pub fn derive(&self, source_id: &str, content_id: &str) -> Option<PathBuf> {
        let root = self.candidates.first()?;
        Some(self.dir_for(root, Layout::Namespaced, content_id, Some(source_id)))
    }

    fn dir_for(&self, root: &Path, layout: Layout, content_id: &str, source_id: Option<&str>) -> PathBuf {
        let content = escape_component(content_id);
        match layout {
            Layout::Namespaced => root
                .join(&self.folder)
                .join(escape_component(source_id.unwrap_or("unknown")))
                .join(content),
            Layout::LegacyFolder => root.join(&self.folder).join(content),
            Layout::Flat => root.join(content),
        }
    }

    /// Find an existing content directory. The namespaced layout is matched
    /// for any source subfolder, since the source id is not known here.
    pub fn locate(&self, content_id: &str) -> Option<PathBuf> {
        for root in &self.candidates {
            if !root.is_dir() {
                continue;
            }
            for layout in Layout::SEARCH_ORDER {
                let found = match layout {
                    Layout::Namespaced => self.find_namespaced(root, content_id),
                    _ => Some(self.dir_for(root, layout, content_id, None)).filter(|p| p.is_dir()),
                };
                if let Some(dir) = found {
                    tracing::debug!(content_id, ?layout, dir = %dir.display(), "located content");
                    return Some(dir);
                }
            }
        }
        None
    }

    fn find_namespaced(&self, root: &Path, content_id: &str) -> Option<PathBuf> {
        let folder = root.join(&self.folder);
        let content = escape_component(content_id);
        let mut sources: Vec<PathBuf> = std::fs::read_dir(&folder)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        sources.sort();
        sources
            .into_iter()
            .map(|source| source.join(&content))
            .find(|candidate| candidate.join(IMAGES_DIR).is_dir() || candidate.join(METADATA_FILE).is_file())
    }
}
