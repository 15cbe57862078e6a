//! Integration tests for peersync
//!
//! These tests run the sender, the receiver, and the propagation engine
//! against each other over real TCP connections and real temporary
//! directories.

use peersync_engine::{ChangePropagationEngine, EngineConfig};
use peersync_net::SyncSender;
use peersync_types::ChangeKind;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use peersync_tests::test_utils::{create_test_tree, start_receiver, wait_for, write_file};

const SETTLE: Duration = Duration::from_millis(100);
const APPLY_TIMEOUT: Duration = Duration::from_secs(3);

fn canonical_root(temp: &TempDir) -> PathBuf {
    temp.path().canonicalize().unwrap()
}

fn test_engine(root: &PathBuf, sender: SyncSender) -> ChangePropagationEngine {
    let config = EngineConfig {
        debounce_window: Duration::from_millis(50),
        settle_delay: SETTLE,
        ..Default::default()
    };
    ChangePropagationEngine::new(root, sender, config).unwrap()
}

#[tokio::test]
async fn test_file_create_round_trip() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());

    let file = write_file(&source_root, "a.txt", b"hello");
    sender.send_file(&file, ChangeKind::Create).await.unwrap();

    let replica = target.path().join("a.txt");
    assert!(wait_for(|| replica.exists(), APPLY_TIMEOUT).await);
    assert_eq!(fs::read(&replica).unwrap(), b"hello");
}

#[tokio::test]
async fn test_wire_record_and_ack_before_payload() {
    let source = TempDir::new().unwrap();
    let source_root = canonical_root(&source);
    let file = write_file(&source_root, "a.txt", b"hello");

    // Hand-rolled peer: captures the metadata record, acknowledges, then
    // drains the payload. The payload can only arrive after the OK because
    // the sender blocks on the acknowledgement first.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        let metadata = String::from_utf8(buf[..n].to_vec()).unwrap();

        stream.write_all(b"OK").await.unwrap();

        let mut payload = Vec::new();
        stream.read_to_end(&mut payload).await.unwrap();
        (metadata, payload)
    });

    let sender = SyncSender::new(&source_root, addr.to_string());
    sender.send_file(&file, ChangeKind::Create).await.unwrap();

    let (metadata, payload) = peer.await.unwrap();
    assert_eq!(metadata, "CREATE|a.txt|5|file");
    assert_eq!(payload, b"hello");
}

#[tokio::test]
async fn test_rejected_acknowledgement_is_a_fault() {
    let source = TempDir::new().unwrap();
    let source_root = canonical_root(&source);
    let file = write_file(&source_root, "a.txt", b"hello");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 256];
        let _ = stream.read(&mut buf).await.unwrap();
        stream.write_all(b"NO").await.unwrap();
    });

    let sender = SyncSender::new(&source_root, addr.to_string());
    assert!(sender.send_file(&file, ChangeKind::Create).await.is_err());
}

#[tokio::test]
async fn test_directory_tree_round_trip() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    let names = create_test_tree(&source_root);

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());
    sender
        .send_directory(&source_root.join("subdir1"), ChangeKind::Create)
        .await
        .unwrap();
    sender
        .send_directory(&source_root.join("subdir2"), ChangeKind::Create)
        .await
        .unwrap();

    for name in names.iter().filter(|n| n.starts_with("subdir")) {
        let replica = target.path().join(name);
        assert!(
            wait_for(|| replica.exists(), APPLY_TIMEOUT).await,
            "missing replica for {}",
            name
        );
        assert_eq!(
            fs::read(source_root.join(name)).unwrap(),
            fs::read(&replica).unwrap()
        );
    }
}

#[tokio::test]
async fn test_delete_round_trip() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    write_file(target.path(), "a.txt", b"stale");

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());

    // The deleted path no longer exists on the sending side.
    sender.send_delete(&source_root.join("a.txt")).await.unwrap();

    let replica = target.path().join("a.txt");
    assert!(wait_for(|| !replica.exists(), APPLY_TIMEOUT).await);
}

#[tokio::test]
async fn test_delete_dispatch_uses_receiver_state() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    // On the receiver the path is a directory, even though the wire record
    // will tag the deletion as a file.
    fs::create_dir(target.path().join("thing")).unwrap();

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());
    sender.send_delete(&source_root.join("thing")).await.unwrap();

    let replica = target.path().join("thing");
    assert!(wait_for(|| !replica.exists(), APPLY_TIMEOUT).await);
}

#[tokio::test]
async fn test_receiver_marker_lifecycle() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());

    let file = write_file(&source_root, "a.txt", b"hello");
    sender.send_file(&file, ChangeKind::Create).await.unwrap();

    // The marker is placed before the acknowledgement, so it is visible as
    // soon as the send returns, and it survives the apply by the settle
    // delay.
    let marker = target.path().join(".peersync/a.txt.sync");
    assert!(marker.exists());
    assert!(wait_for(|| !marker.exists(), APPLY_TIMEOUT).await);

    assert_eq!(fs::read(target.path().join("a.txt")).unwrap(), b"hello");
}

#[tokio::test]
async fn test_engine_sync_marker_lifecycle() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());
    let mut engine = test_engine(&source_root, sender);

    let file = write_file(&source_root, "a.txt", b"hello");
    engine.sync(&file, ChangeKind::Create).await.unwrap();

    // Still covered right after sync returns; cleared once the settle delay
    // has elapsed.
    assert!(engine.markers().is_set(&file));
    let markers = engine.markers().clone();
    let covered = file.clone();
    assert!(wait_for(move || !markers.is_set(&covered), APPLY_TIMEOUT).await);
}

#[tokio::test]
async fn test_move_propagates_delete_then_create() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    write_file(target.path(), "a.txt", b"hello");

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());
    let mut engine = test_engine(&source_root, sender);

    // The move already happened locally: only the destination exists.
    let destination = write_file(&source_root, "b.txt", b"hello");
    let origin = source_root.join("a.txt");
    engine.on_moved(&origin, &destination).await.unwrap();

    assert!(wait_for(|| !target.path().join("a.txt").exists(), APPLY_TIMEOUT).await);
    let replica = target.path().join("b.txt");
    assert!(wait_for(|| replica.exists(), APPLY_TIMEOUT).await);
    assert_eq!(fs::read(&replica).unwrap(), b"hello");
}

#[tokio::test]
async fn test_modify_propagates_only_real_changes() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    let (addr, _server) = start_receiver(target.path(), SETTLE).await;
    let sender = SyncSender::new(&source_root, addr.to_string());
    let mut engine = test_engine(&source_root, sender);

    // First sighting of the content counts as a change and propagates.
    let file = write_file(&source_root, "a.txt", b"one");
    engine.on_modified(&file).await.unwrap();
    let replica = target.path().join("a.txt");
    assert!(wait_for(|| replica.exists(), APPLY_TIMEOUT).await);

    // Let the sync marker settle out, then check again with unchanged
    // content: fingerprinted but not propagated. Removing the replica first
    // makes propagation observable.
    tokio::time::sleep(Duration::from_millis(400)).await;
    fs::remove_file(&replica).unwrap();
    engine.on_modified(&file).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!replica.exists());

    // Changed content after the window propagates again.
    fs::write(&file, b"two").unwrap();
    engine.on_modified(&file).await.unwrap();
    assert!(wait_for(|| replica.exists(), APPLY_TIMEOUT).await);
    assert_eq!(fs::read(&replica).unwrap(), b"two");
}

#[tokio::test]
async fn test_marker_subtree_events_are_ignored() {
    let source = TempDir::new().unwrap();
    let source_root = canonical_root(&source);

    // No listener anywhere: if these notifications were propagated, the
    // engine would report a connection failure.
    let sender = SyncSender::new(&source_root, "127.0.0.1:1");
    let mut engine = test_engine(&source_root, sender);

    let marker_file = source_root.join(".peersync/a.txt.sync");
    engine.on_created(&marker_file).await.unwrap();
    engine.on_modified(&marker_file).await.unwrap();
    engine.on_deleted(&marker_file).await.unwrap();
}

#[tokio::test]
async fn test_inbound_apply_is_not_echoed() {
    // One node runs both a receiver and an engine over the same root. A
    // change applied by the receiver must not be propagated back out by the
    // engine while its marker is still standing.
    let mirror = TempDir::new().unwrap();
    let mirror_root = canonical_root(&mirror);

    let (addr, _server) = start_receiver(&mirror_root, Duration::from_millis(500)).await;

    // The engine's peer is dead: any attempted propagation would error.
    let sender = SyncSender::new(&mirror_root, "127.0.0.1:1");
    let mut engine = test_engine(&mirror_root, sender);

    let remote = TempDir::new().unwrap();
    let remote_root = canonical_root(&remote);
    let file = write_file(&remote_root, "a.txt", b"hello");
    let remote_sender = SyncSender::new(&remote_root, addr.to_string());
    remote_sender
        .send_file(&file, ChangeKind::Create)
        .await
        .unwrap();

    let applied = mirror_root.join("a.txt");
    assert!(wait_for(|| applied.exists(), APPLY_TIMEOUT).await);

    // The notifications the local watcher would now deliver are discarded
    // because the receiver's marker still covers the path.
    engine.on_created(&applied).await.unwrap();
    engine.on_modified(&applied).await.unwrap();
}

#[tokio::test]
async fn test_short_payload_truncates_silently() {
    let target = TempDir::new().unwrap();
    let (addr, _server) = start_receiver(target.path(), SETTLE).await;

    // Announce five bytes but deliver only two before closing.
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"CREATE|short.txt|5|file").await.unwrap();
    let mut ack = [0u8; 2];
    stream.read_exact(&mut ack).await.unwrap();
    assert_eq!(&ack, b"OK");
    stream.write_all(b"he").await.unwrap();
    drop(stream);

    let replica = target.path().join("short.txt");
    assert!(wait_for(|| replica.exists(), APPLY_TIMEOUT).await);
    assert!(
        wait_for(
            || fs::read(&replica).map(|c| c == b"he").unwrap_or(false),
            APPLY_TIMEOUT
        )
        .await
    );
}
