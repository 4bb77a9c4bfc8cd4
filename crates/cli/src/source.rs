//! Where the raster to aggregate comes from

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locates the raster file for a run
pub trait RasterSource {
    /// Path of the raster to read
    fn resolve(&self) -> Result<PathBuf>;
}

/// A fixed raster file
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RasterSource for LocalFile {
    fn resolve(&self) -> Result<PathBuf> {
        if !self.path.is_file() {
            bail!("raster file {} does not exist", self.path.display());
        }
        Ok(self.path.clone())
    }
}

/// The newest raster in a directory of dated files.
///
/// Publishers name their files with a sortable date stamp, so the
/// lexicographically last name with the wanted extension is the newest.
#[derive(Debug, Clone)]
pub struct LatestInDirectory {
    dir: PathBuf,
    extension: String,
}

impl LatestInDirectory {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

impl RasterSource for LatestInDirectory {
    fn resolve(&self) -> Result<PathBuf> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to list {}", self.dir.display()))?
                .path();
            if self.matches(&path) {
                candidates.push(path);
            }
        }
        debug!(count = candidates.len(), dir = %self.dir.display(), "Raster candidates");

        candidates.sort();
        match candidates.pop() {
            Some(latest) => Ok(latest),
            None => bail!(
                "no .{} raster found in {}",
                self.extension,
                self.dir.display()
            ),
        }
    }
}
