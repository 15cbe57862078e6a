//! Outbound change transport
//!
//! One TCP connection per change, opened against the peer's listener. A send
//! blocks its caller for the full metadata exchange plus payload transfer;
//! there is no timeout, no cancellation, and no retry. A transport fault
//! propagates to the caller and aborts the sync that issued it.

use crate::protocol::{ChangeRecord, ACK};
use peersync_fs::DirectoryWalker;
use peersync_types::{ChangeKind, Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Client side of the peer transport
#[derive(Debug, Clone)]
pub struct SyncSender {
    root: PathBuf,
    peer_addr: String,
    chunk_size: usize,
}

impl SyncSender {
    /// Create a sender for a sync root, targeting the peer's listener address
    pub fn new<P: AsRef<Path>, S: Into<String>>(root: P, peer_addr: S) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            peer_addr: peer_addr.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the payload chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Address of the peer's listener
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Send one file change; streams the payload when acknowledged
    pub async fn send_file(&self, path: &Path, kind: ChangeKind) -> Result<()> {
        let relative = self.relative(path)?;

        let size = if kind == ChangeKind::Delete {
            0
        } else {
            fs::metadata(path)
                .await
                .map_err(|e| Error::Io {
                    message: format!("Failed to stat '{}': {}", path.display(), e),
                })?
                .len()
        };

        let record = ChangeRecord::file(kind, relative.clone(), size);
        let (mut stream, acked) = self.request(&record).await?;
        if !acked {
            return Err(Error::network(format!(
                "peer did not acknowledge {} for '{}'",
                kind, relative
            )));
        }

        if kind != ChangeKind::Delete {
            let mut file = fs::File::open(path).await.map_err(|e| Error::Io {
                message: format!("Failed to open '{}': {}", path.display(), e),
            })?;

            let mut buf = vec![0u8; self.chunk_size];
            loop {
                let n = file.read(&mut buf).await.map_err(|e| Error::Io {
                    message: format!("Failed to read '{}': {}", path.display(), e),
                })?;
                if n == 0 {
                    break;
                }
                stream.write_all(&buf[..n]).await.map_err(|e| Error::Network {
                    message: format!("Failed to stream payload for '{}': {}", relative, e),
                })?;
            }

            stream.flush().await.map_err(|e| Error::Network {
                message: format!("Failed to flush payload for '{}': {}", relative, e),
            })?;
        }

        info!("synced file {}", relative);
        Ok(())
    }

    /// Send a deletion; no payload phase
    ///
    /// The record always says `file`: the path no longer exists locally, so
    /// the receiver decides file-vs-directory from its own filesystem state.
    pub async fn send_delete(&self, path: &Path) -> Result<()> {
        let relative = self.relative(path)?;
        let record = ChangeRecord::delete(relative.clone());

        let (_stream, acked) = self.request(&record).await?;
        if !acked {
            return Err(Error::network(format!(
                "peer did not acknowledge DELETE for '{}'",
                relative
            )));
        }

        info!("sent delete for {}", relative);
        Ok(())
    }

    /// Send a whole directory subtree, one connection per node
    ///
    /// Each directory is announced before its contents. A directory record
    /// the peer does not acknowledge skips that directory's files but the
    /// walk continues into the rest of the tree.
    pub async fn send_directory(&self, path: &Path, kind: ChangeKind) -> Result<()> {
        let walker = DirectoryWalker::new(path);
        let mut unacked: HashSet<PathBuf> = HashSet::new();

        for entry in walker.entries() {
            let entry = entry?;
            if entry.is_dir {
                let relative = self.relative(&entry.path)?;
                let record = ChangeRecord::directory(kind, relative.clone());
                let (_stream, acked) = self.request(&record).await?;
                if !acked {
                    warn!("peer did not acknowledge directory {}", relative);
                    unacked.insert(entry.path);
                }
            } else {
                if entry.path.parent().is_some_and(|p| unacked.contains(p)) {
                    debug!("skipping {} under unacknowledged directory", entry.path.display());
                    continue;
                }
                self.send_file(&entry.path, kind).await?;
            }
        }

        info!("synced directory {}", self.relative(path)?);
        Ok(())
    }

    /// Open a connection, send one metadata record, and read the acknowledgement
    async fn request(&self, record: &ChangeRecord) -> Result<(TcpStream, bool)> {
        let mut stream = TcpStream::connect(&self.peer_addr)
            .await
            .map_err(|e| Error::Network {
                message: format!("Failed to connect to peer '{}': {}", self.peer_addr, e),
            })?;

        stream
            .write_all(record.encode().as_bytes())
            .await
            .map_err(|e| Error::Network {
                message: format!("Failed to send metadata record: {}", e),
            })?;

        let mut ack = [0u8; 8];
        let n = stream.read(&mut ack).await.map_err(|e| Error::Network {
            message: format!("Failed to read acknowledgement: {}", e),
        })?;

        Ok((stream, &ack[..n] == ACK.as_bytes()))
    }

    /// Express a path relative to the sync root, as sent on the wire
    fn relative(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).map_err(|_| Error::Sync {
            message: format!("path '{}' is outside the sync root", path.display()),
        })?;
        Ok(relative.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_strips_the_root() {
        let sender = SyncSender::new("/data/tree", "127.0.0.1:9345");
        assert_eq!(
            sender.relative(Path::new("/data/tree/sub/a.txt")).unwrap(),
            "sub/a.txt"
        );
        assert!(sender.relative(Path::new("/elsewhere/a.txt")).is_err());
    }
}
