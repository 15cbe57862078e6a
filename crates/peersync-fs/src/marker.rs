//! Suppression markers for echo-safe change propagation
//!
//! A marker is an on-disk artifact under a reserved subdirectory of the sync
//! root signaling that a sync affecting its path is in flight. The event
//! classifier drops every notification under the reserved subtree, so a node
//! applying a remote change (or reading a file it is about to send) does not
//! re-propagate its own writes. A marker must exist for the entire wall-clock
//! window during which a write to its path may still generate a notification;
//! it is therefore placed before the sync action starts and cleared only
//! after a settle delay has absorbed delayed or duplicate notifications.

use peersync_types::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Store for per-path suppression markers rooted under a sync root
#[derive(Debug, Clone)]
pub struct MarkerStore {
    root: PathBuf,
    dir: PathBuf,
}

impl MarkerStore {
    /// Default name of the reserved marker subdirectory
    pub const DEFAULT_DIR: &'static str = ".peersync";

    /// Create a marker store with the default reserved directory name
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::with_dir_name(root, Self::DEFAULT_DIR)
    }

    /// Create a marker store with a custom reserved directory name
    pub fn with_dir_name<P: AsRef<Path>>(root: P, dir_name: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let dir = root.join(dir_name);

        std::fs::create_dir_all(&dir).map_err(|e| Error::Io {
            message: format!(
                "Failed to create marker directory '{}': {}",
                dir.display(),
                e
            ),
        })?;

        Ok(Self { root, dir })
    }

    /// The reserved marker directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a path lies under the reserved marker subtree
    ///
    /// This is a path-prefix containment test, not a substring match: a user
    /// path that merely contains the marker token in a file name is not
    /// covered.
    pub fn covers<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().starts_with(&self.dir)
    }

    /// Resolve the marker file location for a synced path
    ///
    /// Accepts either an absolute path under the sync root or a path already
    /// relative to it.
    pub fn marker_path<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).map_err(|_| Error::Sync {
                message: format!("path '{}' is outside the sync root", path.display()),
            })?
        } else {
            path
        };

        let mut marker = self.dir.join(relative);
        marker.as_mut_os_string().push(".sync");
        Ok(marker)
    }

    /// Place a marker for a path, creating intermediate directories
    pub async fn place<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let marker = self.marker_path(path)?;

        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Error::Io {
                message: format!(
                    "Failed to create marker parents for '{}': {}",
                    marker.display(),
                    e
                ),
            })?;
        }

        fs::File::create(&marker).await.map_err(|e| Error::Io {
            message: format!("Failed to place marker '{}': {}", marker.display(), e),
        })?;

        debug!("placed marker {}", marker.display());
        Ok(marker)
    }

    /// Clear the marker for a path if it is still present
    pub async fn clear<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let marker = self.marker_path(path)?;

        match fs::remove_file(&marker).await {
            Ok(()) => {
                debug!("cleared marker {}", marker.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io {
                message: format!("Failed to clear marker '{}': {}", marker.display(), e),
            }),
        }
    }

    /// Whether a marker for the path currently exists
    pub fn is_set<P: AsRef<Path>>(&self, path: P) -> bool {
        self.marker_path(path).is_ok_and(|marker| marker.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_covers_is_prefix_not_substring() {
        let temp = TempDir::new().unwrap();
        let store = MarkerStore::new(temp.path()).unwrap();

        assert!(store.covers(temp.path().join(".peersync")));
        assert!(store.covers(temp.path().join(".peersync/a.txt.sync")));

        // A user file whose name contains the marker token is not covered.
        assert!(!store.covers(temp.path().join("notes.peersync.txt")));
        assert!(!store.covers(temp.path().join("a.txt")));
    }

    #[test]
    fn test_marker_path_rejects_foreign_paths() {
        let temp = TempDir::new().unwrap();
        let store = MarkerStore::new(temp.path()).unwrap();

        assert!(store.marker_path("/somewhere/else/a.txt").is_err());
    }

    #[tokio::test]
    async fn test_place_and_clear_lifecycle() {
        let temp = TempDir::new().unwrap();
        let store = MarkerStore::new(temp.path()).unwrap();
        let target = temp.path().join("sub/dir/a.txt");

        let marker = store.place(&target).await.unwrap();
        assert!(marker.exists());
        assert!(store.is_set(&target));

        store.clear(&target).await.unwrap();
        assert!(!store.is_set(&target));

        // Clearing an absent marker is a no-op.
        store.clear(&target).await.unwrap();
    }

    #[tokio::test]
    async fn test_place_accepts_relative_paths() {
        let temp = TempDir::new().unwrap();
        let store = MarkerStore::new(temp.path()).unwrap();

        store.place("nested/b.txt").await.unwrap();
        assert!(store.is_set(temp.path().join("nested/b.txt")));
    }
}
