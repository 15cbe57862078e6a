//! Filesystem notification source
//!
//! Wraps a recursive `notify` watcher and forwards its events into a tokio
//! channel, so the engine can drain them from a single worker. Classification
//! happens in the engine; this module only normalizes the platform event
//! vocabulary.

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use peersync_types::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Normalized kind of a filesystem notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// File or directory was created
    Created,
    /// File content was modified
    Modified,
    /// File or directory was deleted
    Deleted,
    /// File or directory was renamed; carries (source, destination)
    Renamed,
    /// Event with no sync relevance (access, metadata-only, unknown)
    Other,
}

/// A normalized filesystem notification
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// The kind of event
    pub kind: WatchEventKind,
    /// The path(s) affected; two entries for a rename
    pub paths: Vec<PathBuf>,
    /// Whether the event affects a directory
    pub is_dir: bool,
}

impl WatchEvent {
    /// Normalize a raw notify event
    fn from_notify(event: Event) -> Self {
        let kind = match event.kind {
            EventKind::Create(_) => WatchEventKind::Created,
            EventKind::Remove(_) => WatchEventKind::Deleted,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => WatchEventKind::Renamed,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::Deleted,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::Created,
            EventKind::Modify(ModifyKind::Metadata(_)) => WatchEventKind::Other,
            EventKind::Modify(_) => WatchEventKind::Modified,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => WatchEventKind::Other,
        };

        let is_dir = event.paths.iter().any(|p| p.is_dir());

        Self {
            kind,
            paths: event.paths,
            is_dir,
        }
    }
}

/// Recursive filesystem watcher feeding a tokio channel
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<WatchEvent>,
    root: PathBuf,
}

impl FsWatcher {
    /// Start watching a directory tree recursively
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(WatchEvent::from_notify(event));
                }
            },
            Config::default(),
        )
        .map_err(|e| Error::watch(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| Error::watch(e.to_string()))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root,
        })
    }

    /// Receive the next notification; `None` when the watcher is gone
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }

    /// The watched root
    pub fn root(&self) -> &Path {
        &self.root
    }
}
