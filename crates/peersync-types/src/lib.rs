//! Core type system and error handling for peersync
//!
//! This crate provides the foundational types shared by the peersync crates:
//!
//! - **Error handling**: Structured error types for I/O, network, protocol,
//!   and synchronization faults
//! - **Change model**: The change-event vocabulary exchanged between the
//!   watcher, the propagation engine, and the wire transport
//!
//! # Examples
//!
//! ```rust
//! use peersync_types::{ChangeEvent, ChangeKind};
//! use std::path::PathBuf;
//!
//! let event = ChangeEvent::new(ChangeKind::Create, PathBuf::from("a.txt"), false);
//! assert_eq!(event.kind.to_string(), "CREATE");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use types::{ChangeEvent, ChangeKind, EntryKind};
