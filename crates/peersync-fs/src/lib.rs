//! Filesystem primitives for peersync
//!
//! This crate provides the low-level filesystem building blocks shared by the
//! propagation engine and the network transport:
//!
//! - **Suppression markers**: on-disk artifacts that flag "a sync affecting
//!   this path is in progress" so self-triggered notifications can be dropped
//! - **Content fingerprints**: blake3 digests used to detect no-op modify
//!   notifications
//! - **Directory traversal**: lazy walker expanding a directory into its
//!   contained entries

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod fingerprint;
pub mod marker;
pub mod walker;

pub use fingerprint::{fingerprint_file, FingerprintTable};
pub use marker::MarkerStore;
pub use walker::{DirectoryWalker, WalkedEntry};
