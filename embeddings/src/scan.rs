//! Image path enumeration.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{EmbeddingError, Result};

/// Walks an input root and collects the images to embed.
#[derive(Debug, Clone, Default)]
pub struct ImageScanner {
    config: ScanConfig,
}

impl ImageScanner {
    /// Create a scanner with custom options.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Enumerate images under `root`.
    ///
    /// A root that exists but is not a directory is returned as-is, whatever
    /// its extension. Directory results are sorted by path bytes so that
    /// repeated runs produce the same row order regardless of how the
    /// platform iterates directories.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let metadata = match std::fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EmbeddingError::NotFound(root.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            debug!("Input {} is a single file", root.display());
            return Ok(vec![root.to_path_buf()]);
        }

        let walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            // Without follow_links, walkdir reports symlinks as such; keep the
            // ones that resolve to a regular file.
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            if self.config.matches(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        info!("Found {} images under {}", paths.len(), root.display());
        Ok(paths)
    }
}

/// Enumerate images under `root` with the default extension set.
pub fn enumerate_images(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    ImageScanner::default().scan(root.as_ref())
}
