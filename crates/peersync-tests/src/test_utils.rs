//! Unified test utilities for the peersync integration tests

use peersync_net::{ReceiverConfig, SyncReceiver};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Write a file under a root, creating parent directories as needed
pub fn write_file(root: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Build a small directory structure with files at several depths
///
/// Returns the root-relative names of the created files.
pub fn create_test_tree(root: &Path) -> Vec<&'static str> {
    let files = [
        ("top.txt", b"top level".as_slice()),
        ("subdir1/file1.txt", b"first".as_slice()),
        ("subdir2/file2.txt", b"second".as_slice()),
        ("subdir1/nested/file3.txt", b"deep".as_slice()),
    ];

    for (name, content) in &files {
        write_file(root, name, content);
    }

    files.iter().map(|(name, _)| *name).collect()
}

/// Poll a condition until it holds or the timeout elapses
pub async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Start a receiver for a root on an ephemeral port
///
/// Returns the bound address and the serving task.
pub async fn start_receiver(root: &Path, settle_delay: Duration) -> (SocketAddr, JoinHandle<()>) {
    let mut config = ReceiverConfig::new("127.0.0.1:0".parse().unwrap(), root);
    config.settle_delay = settle_delay;

    let mut receiver = SyncReceiver::new(config);
    let addr = receiver.bind().await.unwrap();

    let handle = tokio::spawn(async move {
        let _ = receiver.start().await;
    });

    (addr, handle)
}
