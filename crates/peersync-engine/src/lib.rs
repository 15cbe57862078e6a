//! Echo-safe change-propagation engine for peersync
//!
//! This crate turns raw filesystem notifications into sync-worthy changes
//! shipped to the peer, without falling into the echo loop where applying a
//! remote change locally regenerates the same change back to its origin:
//!
//! - **Classification**: notifications under the reserved marker subtree are
//!   dropped; modify bursts are debounced and verified against content
//!   fingerprints before anything is transmitted
//! - **Suppression**: a marker covers every path with a sync in flight, and
//!   outlives the sync by a settle delay to absorb late notifications
//! - **Watching**: a notify-backed watcher feeds the engine through a
//!   channel; handlers run strictly sequentially
//!
//! # Examples
//!
//! ```rust,no_run
//! use peersync_engine::{ChangePropagationEngine, EngineConfig, FsWatcher};
//! use peersync_net::SyncSender;
//!
//! # async fn example() -> peersync_types::Result<()> {
//! let sender = SyncSender::new("/data/tree", "peer.example:9345");
//! let mut engine =
//!     ChangePropagationEngine::new("/data/tree", sender, EngineConfig::default())?;
//! let mut watcher = FsWatcher::new("/data/tree")?;
//! engine.run(&mut watcher).await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod watcher;

pub use engine::{ChangePropagationEngine, EngineConfig};
pub use watcher::{FsWatcher, WatchEvent, WatchEventKind};
