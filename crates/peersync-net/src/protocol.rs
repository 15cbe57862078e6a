//! Wire protocol definitions
//!
//! One change per connection. The client opens a TCP connection and sends a
//! single text record `EVENTTYPE|RELATIVE_PATH|SIZE|FILETYPE`; the server
//! replies with the literal token [`ACK`] once the request is recorded (a
//! ready-to-receive signal, not a completion signal). If the record announces
//! a file payload, exactly `SIZE` bytes follow on the same connection, then
//! the connection closes.

use peersync_types::{ChangeKind, EntryKind, Error, Result};
use std::fmt;

/// Literal acknowledgement token sent by the receiver
pub const ACK: &str = "OK";

/// Upper bound on the size of a metadata record read
pub const METADATA_CAPACITY: usize = 4096;

/// Metadata record describing one change on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// What happened to the path
    pub kind: ChangeKind,
    /// Path relative to the sync root on both nodes
    pub relative_path: String,
    /// Payload byte count; zero unless a file payload follows
    pub size: u64,
    /// Whether the record names a file or a directory
    pub entry: EntryKind,
}

impl ChangeRecord {
    /// Record for a file change, optionally followed by `size` payload bytes
    pub fn file<S: Into<String>>(kind: ChangeKind, relative_path: S, size: u64) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
            size,
            entry: EntryKind::File,
        }
    }

    /// Record for a directory node; never carries a payload
    pub fn directory<S: Into<String>>(kind: ChangeKind, relative_path: S) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
            size: 0,
            entry: EntryKind::Directory,
        }
    }

    /// Record for a deletion
    ///
    /// The entry kind is always `file`: the path is already gone on the
    /// sending node, so directory-ness cannot be inspected there. The
    /// receiver dispatches on its own filesystem state instead.
    pub fn delete<S: Into<String>>(relative_path: S) -> Self {
        Self::file(ChangeKind::Delete, relative_path, 0)
    }

    /// Encode the record as its wire text form
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse a record from its wire text form
    pub fn parse(input: &str) -> Result<Self> {
        let fields: Vec<&str> = input.split('|').collect();
        let [kind, relative_path, size, entry] = fields.as_slice() else {
            return Err(Error::protocol(format!(
                "expected 4 metadata fields, got {}",
                fields.len()
            )));
        };

        Ok(Self {
            kind: kind.parse()?,
            relative_path: (*relative_path).to_string(),
            size: size
                .parse()
                .map_err(|_| Error::protocol(format!("invalid size field '{}'", size)))?,
            entry: entry.parse()?,
        })
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.kind, self.relative_path, self.size, self.entry
        )
    }
}
