//! Disk I/O and file lifecycle for content directories.
//!
//! Pages are written to `<name>.part` and renamed onto the final name once
//! complete; metadata is written the same way so readers never see a
//! half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{PdmError, Result};
use crate::layout::{is_image_extension, IMAGES_DIR, MARKER_FILE, METADATA_FILE};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `page_001.jpg` → `page_001.jpg.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Atomically rename the temp file onto its final path.
pub fn finalize(temp: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp, final_path).map_err(|e| {
        PdmError::fs(
            format!("rename {} -> {}", temp.display(), final_path.display()),
            e,
        )
    })
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| PdmError::fs(format!("create {}", dir.display()), e))
}

/// Write `bytes` to `path` via a synced temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    let write = || -> io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()
    };
    if let Err(e) = write() {
        let _ = fs::remove_file(&tmp);
        return Err(PdmError::fs(format!("write {}", tmp.display()), e));
    }
    finalize(&tmp, path)
}

/// Create the zero-byte media-scanner marker in `dir`.
pub fn create_marker(dir: &Path) -> Result<()> {
    let path = dir.join(MARKER_FILE);
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .map(|_| ())
        .map_err(|e| PdmError::fs(format!("create {}", path.display()), e))
}

/// Length of a regular file, or `None` when it is missing or empty.
pub fn non_empty_len(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file() && m.len() > 0)
        .map(|m| m.len())
}

/// Image files in `<content_dir>/images`, sorted by name.
/// A missing directory yields an empty list.
pub fn list_page_files(content_dir: &Path) -> Vec<PathBuf> {
    let images = content_dir.join(IMAGES_DIR);
    let Ok(entries) = fs::read_dir(&images) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(is_image_extension)
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// Delete a content directory. Tries a recursive delete first; if anything
/// is left behind, removes the known items one by one. Returns true when the
/// directory no longer exists.
pub fn delete_content_dir(dir: &Path) -> bool {
    if !dir.exists() {
        return true;
    }
    match fs::remove_dir_all(dir) {
        Ok(()) if !dir.exists() => return true,
        Ok(()) => {}
        Err(e) => {
            tracing::warn!(dir = %dir.display(), "recursive delete failed: {}", e);
        }
    }

    let images = dir.join(IMAGES_DIR);
    if let Ok(entries) = fs::read_dir(&images) {
        for entry in entries.filter_map(|e| e.ok()) {
            let _ = fs::remove_file(entry.path());
        }
    }
    let _ = fs::remove_dir(&images);
    let _ = fs::remove_file(dir.join(METADATA_FILE));
    let _ = fs::remove_file(dir.join(MARKER_FILE));
    if let Err(e) = fs::remove_dir(dir) {
        tracing::warn!(dir = %dir.display(), "itemized delete left residue: {}", e);
    }
    !dir.exists()
}
