// Upload storage - filesystem store keyed by original filename
// Overwrite on conflict, no cleanup policy; files accumulate by design

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem store for uploaded datasets, rooted at the uploads directory.
/// Filenames are reduced to their final path component so an upload can never
/// escape the root.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open (and create if needed) the store directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(UploadStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist uploaded bytes under their (sanitized) original filename,
    /// overwriting any previous upload with the same name. Returns the name
    /// the bytes were stored under.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let name = sanitize(filename);
        fs::write(self.root.join(&name), bytes)?;
        log::info!("stored upload '{}' ({} bytes)", name, bytes.len());
        Ok(name)
    }

    /// Load previously stored bytes by name.
    pub fn load(&self, filename: &str) -> Result<Vec<u8>> {
        let name = sanitize(filename);
        Ok(fs::read(self.root.join(name))?)
    }
}

/// Final path component of the submitted filename; empty and dot-only names
/// fall back to a fixed placeholder.
fn sanitize(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        "upload.csv".to_string()
    } else {
        name
    }
}

// ============================================================================
// TESTS
// ============================================================================
