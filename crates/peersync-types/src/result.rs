//! Result type alias for peersync operations

/// Result type used throughout the peersync crates
pub type Result<T> = std::result::Result<T, crate::error::Error>;
