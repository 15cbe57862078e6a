//! Content fingerprinting for no-op modify detection

use peersync_types::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Compute the content digest of a file
pub async fn fingerprint_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let content = fs::read(path).await.map_err(|e| Error::Io {
        message: format!("Failed to read file '{}': {}", path.display(), e),
    })?;

    Ok(blake3::hash(&content).to_hex().to_string())
}

/// Mapping of path to last-seen content digest
///
/// Entries are created and updated only when a content change is observed;
/// they are never expired and grow for the process lifetime.
#[derive(Debug, Default)]
pub struct FingerprintTable {
    entries: HashMap<PathBuf, String>,
}

impl FingerprintTable {
    /// Create an empty fingerprint table
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a file's content differs from its last recorded digest
    ///
    /// Returns `false` for paths that are not regular files (directories, or
    /// paths that vanished between the notification and the check). When the
    /// content did change, the new digest is recorded before returning.
    pub async fn has_changed<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();

        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Ok(false),
        }

        let digest = fingerprint_file(path).await?;
        if self.entries.get(path) == Some(&digest) {
            debug!("unchanged content for {}", path.display());
            return Ok(false);
        }

        self.entries.insert(path.to_path_buf(), digest);
        Ok(true)
    }

    /// Number of tracked paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
