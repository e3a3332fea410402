//! Content directory access
//!
//! Files live at `<base-dir>/<type>/<version>.<ext>`. A missing file is an
//! expected outcome and is reported as `NotFound`, separately from other
//! read failures.

use crate::content::ContentKey;
use crate::error::{IoResultExt, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default content root
pub const DEFAULT_BASE_DIR: &str = "/nakama/data";

/// Default content file extension
pub const DEFAULT_EXTENSION: &str = "json";

/// Read-only view over the content directory
#[derive(Debug, Clone)]
pub struct ContentLibrary {
    base_dir: PathBuf,
    extension: String,
}

impl ContentLibrary {
    /// Create a library rooted at `base_dir` using the default extension
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_extension(base_dir, DEFAULT_EXTENSION)
    }

    /// Create a library with a custom file extension
    pub fn with_extension(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    /// Content root
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File extension used for content files
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Location of the file for a key
    pub fn path_for(&self, key: &ContentKey) -> PathBuf {
        self.base_dir
            .join(&key.kind)
            .join(format!("{}.{}", key.version, self.extension))
    }

    /// Read the full content for a key
    pub fn read(&self, key: &ContentKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        fs::read(&path).with_path(path)
    }

    /// Versions available for a content type, sorted
    pub fn list_versions(&self, kind: &str) -> Result<Vec<String>> {
        crate::content::validate_segment("type", kind)?;

        let dir = self.base_dir.join(kind);
        let mut versions = Vec::new();

        for entry in fs::read_dir(&dir).with_path(&dir)? {
            let entry = entry.with_path(&dir)?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                versions.push(stem.to_string());
            }
        }

        versions.sort();
        Ok(versions)
    }
}

impl Default for ContentLibrary {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}
