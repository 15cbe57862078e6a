//! Change classification and propagation
//!
//! The engine owns all echo-suppression state for one sync root: the marker
//! store, the fingerprint table, the debounce table, and the in-flight guard.
//! Handlers are invoked sequentially from a single worker; a modify or move
//! notification arriving while any sync is in progress is dropped, not
//! queued.

use crate::watcher::{FsWatcher, WatchEvent, WatchEventKind};
use peersync_fs::{FingerprintTable, MarkerStore};
use peersync_net::SyncSender;
use peersync_types::{ChangeKind, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum elapsed time between two content checks for the same path
    pub debounce_window: Duration,
    /// Wait after a sync completes before its marker is cleared
    pub settle_delay: Duration,
    /// Name of the reserved marker subdirectory
    pub marker_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            marker_dir: MarkerStore::DEFAULT_DIR.to_string(),
        }
    }
}

/// Turns filesystem notifications into changes shipped to the peer
#[derive(Debug)]
pub struct ChangePropagationEngine {
    markers: MarkerStore,
    sender: SyncSender,
    fingerprints: FingerprintTable,
    debounce: HashMap<PathBuf, Instant>,
    debounce_window: Duration,
    settle_delay: Duration,
    in_flight: bool,
}

impl ChangePropagationEngine {
    /// Create an engine for one sync root
    pub fn new<P: AsRef<Path>>(root: P, sender: SyncSender, config: EngineConfig) -> Result<Self> {
        let markers = MarkerStore::with_dir_name(root, &config.marker_dir)?;

        Ok(Self {
            markers,
            sender,
            fingerprints: FingerprintTable::new(),
            debounce: HashMap::new(),
            debounce_window: config.debounce_window,
            settle_delay: config.settle_delay,
            in_flight: false,
        })
    }

    /// The engine's marker store
    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    /// Whether a notification for this path is self-inflicted
    ///
    /// True for paths inside the reserved marker subtree and for paths whose
    /// own marker currently exists (a sync touching them is in flight, here
    /// or on the receiving side of the link).
    fn is_suppressed(&self, path: &Path) -> bool {
        self.markers.covers(path) || self.markers.is_set(path)
    }

    /// Drain a watcher, propagating each notification in order
    ///
    /// A failed propagation aborts only the change that triggered it; the
    /// loop keeps running.
    pub async fn run(&mut self, watcher: &mut FsWatcher) {
        info!("watching directory: {}", watcher.root().display());
        while let Some(event) = watcher.next_event().await {
            if let Err(e) = self.handle_event(&event).await {
                error!("failed to propagate change: {}", e);
            }
        }
        warn!("notification source closed");
    }

    /// Dispatch one normalized notification to the matching handler
    pub async fn handle_event(&mut self, event: &WatchEvent) -> Result<()> {
        match event.kind {
            WatchEventKind::Created => {
                for path in &event.paths {
                    self.on_created(path).await?;
                }
            }
            WatchEventKind::Modified => {
                for path in &event.paths {
                    self.on_modified(path).await?;
                }
            }
            WatchEventKind::Deleted => {
                for path in &event.paths {
                    self.on_deleted(path).await?;
                }
            }
            WatchEventKind::Renamed => {
                if let [src, dst] = event.paths.as_slice() {
                    self.on_moved(src, dst).await?;
                } else {
                    debug!("rename event without both endpoints, ignoring");
                }
            }
            WatchEventKind::Other => {}
        }
        Ok(())
    }

    /// A path was created; always propagated
    pub async fn on_created(&mut self, path: &Path) -> Result<()> {
        if self.is_suppressed(path) {
            return Ok(());
        }

        info!("created: {}", path.display());
        self.sync(path, ChangeKind::Create).await
    }

    /// A path was deleted; always propagated, even mid-sync
    pub async fn on_deleted(&mut self, path: &Path) -> Result<()> {
        if self.is_suppressed(path) {
            return Ok(());
        }

        info!("deleted: {}", path.display());
        self.sync(path, ChangeKind::Delete).await
    }

    /// File content may have changed; debounced and fingerprint-checked
    ///
    /// Within the debounce window the notification is dropped outright. Once
    /// the window has elapsed the content is fingerprinted and propagated
    /// only on a real change; the debounce timestamp advances either way.
    pub async fn on_modified(&mut self, path: &Path) -> Result<()> {
        if self.is_suppressed(path) || self.in_flight {
            return Ok(());
        }

        let now = Instant::now();
        if let Some(last) = self.debounce.get(path) {
            if now.duration_since(*last) <= self.debounce_window {
                return Ok(());
            }
        }

        if self.fingerprints.has_changed(path).await? {
            info!("modified: {}", path.display());
            self.sync(path, ChangeKind::Modify).await?;
        }
        self.debounce.insert(path.to_path_buf(), now);

        Ok(())
    }

    /// A path was renamed; propagated as a delete of the source followed by a
    /// create of the destination
    pub async fn on_moved(&mut self, src: &Path, dst: &Path) -> Result<()> {
        if self.is_suppressed(src) || self.in_flight {
            return Ok(());
        }

        info!("moved: {} -> {}", src.display(), dst.display());
        self.sync(src, ChangeKind::Delete).await?;
        self.sync(dst, ChangeKind::Create).await?;
        self.debounce.insert(src.to_path_buf(), Instant::now());

        Ok(())
    }

    /// Ship one change to the peer under marker cover
    ///
    /// The marker is placed before anything touches the path and outlives
    /// this call by the settle delay; the in-flight guard is released even
    /// when the transport fails.
    pub async fn sync(&mut self, path: &Path, kind: ChangeKind) -> Result<()> {
        self.markers.place(path).await?;

        self.in_flight = true;
        let outcome = self.dispatch(path, kind).await;
        self.in_flight = false;

        let markers = self.markers.clone();
        let settle_delay = self.settle_delay;
        let path = path.to_path_buf();
        tokio::spawn(async move {
            tokio::time::sleep(settle_delay).await;
            if let Err(e) = markers.clear(&path).await {
                warn!("failed to clear marker for {}: {}", path.display(), e);
            }
        });

        outcome
    }

    /// Route a change to the matching transport operation
    ///
    /// Directory-ness is checked at call time; for deletions the path is
    /// already gone, so they always go out as plain delete records.
    async fn dispatch(&self, path: &Path, kind: ChangeKind) -> Result<()> {
        if kind == ChangeKind::Delete {
            self.sender.send_delete(path).await
        } else if path.is_dir() {
            debug!("syncing directory: {}", path.display());
            self.sender.send_directory(path, kind).await
        } else {
            debug!("syncing file: {}", path.display());
            self.sender.send_file(path, kind).await
        }
    }
}
