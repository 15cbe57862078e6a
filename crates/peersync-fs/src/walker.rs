//! Lazy directory traversal

use peersync_types::{Error, Result};
use std::path::{Path, PathBuf};

/// One entry produced by a directory walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedEntry {
    /// Absolute path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// Lazy, one-pass walker over a directory subtree
///
/// Entries are yielded depth-first with each directory before its contents.
/// The walk reflects filesystem state entry by entry and is not resilient to
/// concurrent mutation of the tree.
#[derive(Debug)]
pub struct DirectoryWalker {
    root: PathBuf,
}

impl DirectoryWalker {
    /// Create a walker rooted at a directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Iterate over every entry (directories and regular files) of the subtree
    pub fn entries(&self) -> impl Iterator<Item = Result<WalkedEntry>> {
        walkdir::WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() || file_type.is_file() {
                        Some(Ok(WalkedEntry {
                            path: entry.into_path(),
                            is_dir: file_type.is_dir(),
                        }))
                    } else {
                        None
                    }
                }
                Err(e) => Some(Err(Error::Io {
                    message: format!("Directory walk failed: {}", e),
                })),
            })
    }

    /// Iterate over every regular file of the subtree
    pub fn files(&self) -> impl Iterator<Item = Result<PathBuf>> {
        self.entries().filter_map(|entry| match entry {
            Ok(entry) if !entry.is_dir => Some(Ok(entry.path)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }
}
