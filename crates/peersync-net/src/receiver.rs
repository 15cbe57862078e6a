//! Inbound change transport
//!
//! A long-lived listener accepts one connection per change and applies it to
//! the local tree. Each connection is handled on its own task with no mutual
//! exclusion across connections: two peers writing the same path concurrently
//! race with no ordering guarantee. That is a documented weakness of the
//! transport, not something this module tries to fix.

use crate::protocol::{self, ChangeRecord, ACK};
use peersync_fs::MarkerStore;
use peersync_types::{ChangeKind, EntryKind, Error, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Listener bind address
    pub bind_addr: SocketAddr,
    /// Local sync root the inbound changes are applied to
    pub root: PathBuf,
    /// Wait after applying a change before its marker is cleared
    pub settle_delay: Duration,
    /// Chunk size for reading file payloads
    pub chunk_size: usize,
    /// Name of the reserved marker subdirectory
    pub marker_dir: String,
}

impl ReceiverConfig {
    /// Create a configuration with default timing and buffer values
    pub fn new<P: AsRef<Path>>(bind_addr: SocketAddr, root: P) -> Self {
        Self {
            bind_addr,
            root: root.as_ref().to_path_buf(),
            settle_delay: Duration::from_secs(1),
            chunk_size: 8192,
            marker_dir: MarkerStore::DEFAULT_DIR.to_string(),
        }
    }
}

/// Shared state handed to every connection task
#[derive(Debug)]
struct ReceiverContext {
    root: PathBuf,
    markers: MarkerStore,
    settle_delay: Duration,
    chunk_size: usize,
}

/// Server side of the peer transport
#[derive(Debug)]
pub struct SyncReceiver {
    config: ReceiverConfig,
    listener: Option<TcpListener>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    is_running: Arc<RwLock<bool>>,
}

impl SyncReceiver {
    /// Create a new receiver
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            listener: None,
            shutdown_tx: None,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Bind the listener ahead of [`start`](Self::start)
    ///
    /// Returns the bound address; useful when the configuration names an
    /// ephemeral port.
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| Error::Network {
                message: format!("Failed to bind to {}: {}", self.config.bind_addr, e),
            })?;

        let addr = listener.local_addr().map_err(|e| Error::Network {
            message: format!("Failed to resolve local address: {}", e),
        })?;

        self.listener = Some(listener);
        Ok(addr)
    }

    /// Serve inbound changes until [`stop`](Self::stop) is called
    pub async fn start(&mut self) -> Result<()> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => TcpListener::bind(self.config.bind_addr)
                .await
                .map_err(|e| Error::Network {
                    message: format!("Failed to bind to {}: {}", self.config.bind_addr, e),
                })?,
        };

        let markers = MarkerStore::with_dir_name(&self.config.root, &self.config.marker_dir)?;
        let ctx = Arc::new(ReceiverContext {
            root: self.config.root.clone(),
            markers,
            settle_delay: self.config.settle_delay,
            chunk_size: self.config.chunk_size,
        });

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);
        *self.is_running.write().await = true;
        let is_running = Arc::clone(&self.is_running);

        info!(
            "listening on {}",
            listener
                .local_addr()
                .map_or_else(|_| self.config.bind_addr.to_string(), |a| a.to_string())
        );

        tokio::select! {
            _ = async {
                loop {
                    if !*is_running.read().await {
                        break;
                    }

                    match listener.accept().await {
                        Ok((stream, addr)) => {
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, addr, ctx).await {
                                    error!("error handling peer {}: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("failed to accept connection: {}", e);
                        }
                    }
                }
            } => {},
            _ = shutdown_rx.recv() => {
                info!("received shutdown signal");
            }
        }

        *self.is_running.write().await = false;
        Ok(())
    }

    /// Signal the listener to stop accepting connections
    pub async fn stop(&mut self) {
        *self.is_running.write().await = false;

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }
    }

    /// Whether the listener loop is currently running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Handle one inbound change on its own task
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        ctx: Arc<ReceiverContext>,
    ) -> Result<()> {
        let mut buf = vec![0u8; protocol::METADATA_CAPACITY];
        let n = stream.read(&mut buf).await.map_err(|e| Error::Network {
            message: format!("Failed to read metadata record: {}", e),
        })?;
        if n == 0 {
            return Err(Error::protocol("connection closed before metadata record"));
        }

        let text = std::str::from_utf8(&buf[..n])
            .map_err(|_| Error::protocol("metadata record is not valid UTF-8"))?;
        let record = ChangeRecord::parse(text)?;
        debug!(
            "received {} for '{}' from {}",
            record.kind, record.relative_path, addr
        );

        let local = ctx.root.join(&record.relative_path);

        // Mark the path before acknowledging, and regardless of how the apply
        // turns out: the marker must already cover the upcoming write when the
        // local watcher observes it.
        ctx.markers.place(&local).await?;

        stream
            .write_all(ACK.as_bytes())
            .await
            .map_err(|e| Error::Network {
                message: format!("Failed to send acknowledgement: {}", e),
            })?;

        let applied = Self::apply(&mut stream, &record, &local, &ctx).await;

        tokio::time::sleep(ctx.settle_delay).await;
        let cleared = ctx.markers.clear(&local).await;

        applied.and(cleared)
    }

    /// Apply one change to the local tree
    async fn apply(
        stream: &mut TcpStream,
        record: &ChangeRecord,
        local: &Path,
        ctx: &ReceiverContext,
    ) -> Result<()> {
        if record.kind == ChangeKind::Delete {
            // Directory-ness is decided here, from local state: the wire
            // record cannot know it (the path is already gone on the sender).
            return match fs::metadata(local).await {
                Ok(meta) if meta.is_dir() => {
                    fs::remove_dir(local).await.map_err(|e| Error::Io {
                        message: format!(
                            "Failed to delete directory '{}': {}",
                            local.display(),
                            e
                        ),
                    })?;
                    info!("deleted directory {}", record.relative_path);
                    Ok(())
                }
                Ok(_) => {
                    fs::remove_file(local).await.map_err(|e| Error::Io {
                        message: format!("Failed to delete file '{}': {}", local.display(), e),
                    })?;
                    info!("deleted file {}", record.relative_path);
                    Ok(())
                }
                Err(_) => Ok(()),
            };
        }

        if record.kind == ChangeKind::Create && record.entry == EntryKind::Directory {
            fs::create_dir_all(local).await.map_err(|e| Error::Io {
                message: format!("Failed to create directory '{}': {}", local.display(), e),
            })?;
            info!("created directory {}", record.relative_path);
        }

        if record.entry == EntryKind::File {
            if let Some(parent) = local.parent() {
                fs::create_dir_all(parent).await.map_err(|e| Error::Io {
                    message: format!(
                        "Failed to create parents for '{}': {}",
                        local.display(),
                        e
                    ),
                })?;
            }

            let mut file = fs::File::create(local).await.map_err(|e| Error::Io {
                message: format!("Failed to create file '{}': {}", local.display(), e),
            })?;

            let mut buf = vec![0u8; ctx.chunk_size];
            let mut remaining = record.size;
            while remaining > 0 {
                let want = remaining.min(buf.len() as u64) as usize;
                let n = stream
                    .read(&mut buf[..want])
                    .await
                    .map_err(|e| Error::Network {
                        message: format!("Failed to read payload: {}", e),
                    })?;
                if n == 0 {
                    // Short connection: keep what arrived, no integrity check.
                    break;
                }
                file.write_all(&buf[..n]).await.map_err(|e| Error::Io {
                    message: format!("Failed to write '{}': {}", local.display(), e),
                })?;
                remaining -= n as u64;
            }

            file.flush().await.map_err(|e| Error::Io {
                message: format!("Failed to flush '{}': {}", local.display(), e),
            })?;
            info!("saved file {} ({} bytes)", record.relative_path, record.size);
        }

        Ok(())
    }
}
