//! peersync integration test suite
//!
//! This crate exercises the peersync components together over real TCP
//! connections and real temporary directories: wire round-trips, echo
//! suppression, marker lifecycles, and the debounce/fingerprint pipeline.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Common helpers used across the integration tests: building temporary
/// trees, starting a receiver on an ephemeral port, and polling for
/// asynchronously applied effects.
pub mod test_utils;
