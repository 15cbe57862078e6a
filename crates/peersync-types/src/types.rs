//! Change-event vocabulary shared across the peersync crates
//!
//! These types describe what happened to a path, both on the local filesystem
//! (as classified from raw notifications) and on the wire (as the first field
//! of a metadata record).

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of change applied to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Path was created
    Create,
    /// File content was modified
    Modify,
    /// Path was removed
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Modify => write!(f, "MODIFY"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "MODIFY" => Ok(Self::Modify),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::protocol(format!("unknown event type '{}'", other))),
        }
    }
}

/// Kind of filesystem entry named by a wire record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file, optionally followed by a payload
    File,
    /// Directory node, never carries a payload
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "directory" => Ok(Self::Directory),
            other => Err(Error::protocol(format!("unknown file type '{}'", other))),
        }
    }
}

/// A single sync-worthy filesystem change
///
/// Ephemeral: produced by the notification source or synthesized while
/// expanding a directory, consumed by the propagation engine, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened to the path
    pub kind: ChangeKind,
    /// Affected path, relative to the sync root
    pub path: PathBuf,
    /// Whether the path names a directory
    pub is_directory: bool,
}

impl ChangeEvent {
    /// Create a new change event
    pub fn new(kind: ChangeKind, path: PathBuf, is_directory: bool) -> Self {
        Self {
            kind,
            path,
            is_directory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_tokens() {
        assert_eq!(ChangeKind::Create.to_string(), "CREATE");
        assert_eq!(ChangeKind::Modify.to_string(), "MODIFY");
        assert_eq!(ChangeKind::Delete.to_string(), "DELETE");

        assert_eq!("CREATE".parse::<ChangeKind>().unwrap(), ChangeKind::Create);
        assert_eq!("DELETE".parse::<ChangeKind>().unwrap(), ChangeKind::Delete);
        assert!("create".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn test_entry_kind_tokens() {
        assert_eq!(EntryKind::File.to_string(), "file");
        assert_eq!(EntryKind::Directory.to_string(), "directory");

        assert_eq!("file".parse::<EntryKind>().unwrap(), EntryKind::File);
        assert_eq!(
            "directory".parse::<EntryKind>().unwrap(),
            EntryKind::Directory
        );
        assert!("symlink".parse::<EntryKind>().is_err());
    }

    #[test]
    fn test_change_event_creation() {
        let event = ChangeEvent::new(ChangeKind::Modify, PathBuf::from("dir/a.txt"), false);
        assert_eq!(event.kind, ChangeKind::Modify);
        assert!(!event.is_directory);
    }
}
