//! Peer transport for peersync
//!
//! This crate implements the wire exchange used to ship one filesystem change
//! to the peer node and apply it there:
//!
//! - **Protocol**: one text metadata record per TCP connection, acknowledged
//!   with a literal `OK` before any payload bytes flow
//! - **Sender**: serializes one change (metadata + optional payload) per
//!   connection; no reuse, no pipelining, no retry
//! - **Receiver**: long-lived listener applying inbound changes to the local
//!   tree while marking the affected paths so the local notification source
//!   does not re-propagate the writes
//!
//! # Examples
//!
//! ```rust,no_run
//! use peersync_net::{ReceiverConfig, SyncReceiver, SyncSender};
//! use peersync_types::ChangeKind;
//! use std::path::Path;
//!
//! # async fn example() -> peersync_types::Result<()> {
//! let config = ReceiverConfig::new("127.0.0.1:9345".parse().unwrap(), "/data/mirror");
//! let mut receiver = SyncReceiver::new(config);
//! tokio::spawn(async move { receiver.start().await });
//!
//! let sender = SyncSender::new("/data/tree", "127.0.0.1:9345");
//! sender
//!     .send_file(Path::new("/data/tree/a.txt"), ChangeKind::Create)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod protocol;
pub mod receiver;
pub mod sender;

pub use protocol::{ChangeRecord, ACK};
pub use receiver::{ReceiverConfig, SyncReceiver};
pub use sender::SyncSender;
