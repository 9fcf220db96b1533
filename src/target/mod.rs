//! Output targets
//!
//! A target is where an upload lands: a regular file, a raw device opened
//! with O_DIRECT, or nothing at all. The pipeline only needs `Write`; the
//! transfer session additionally syncs and closes the target once the copy
//! is done.
//!
//! # Target Types
//!
//! - **File**: regular files and block devices (`file::FileTarget`)
//! - **Discard**: swallows everything in-process (`DiscardTarget`)

use crate::Result;
use std::io::{self, Write};

/// Output target for a transfer
///
/// Targets must be `Send`: the pipeline's writer stage runs on its own thread.
pub trait Target: Write + Send {
    /// Flush written data to stable storage
    ///
    /// Targets that cannot be synced (e.g. `/dev/null`, which fails fsync
    /// with EINVAL) report `SyncOutcome::Unsupported` instead of an error.
    fn sync(&mut self) -> Result<SyncOutcome>;

    /// Release the target, surfacing errors the OS reports on close
    fn close(self: Box<Self>) -> Result<()>;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}

/// Open flags for file targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Use direct IO (O_DIRECT) - bypass page cache
    pub direct: bool,

    /// Create the target if it doesn't exist
    pub create: bool,

    /// Truncate the target to zero size on open
    pub truncate: bool,
}

/// What `Target::sync` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Data reached stable storage
    Synced,
    /// The target has nothing to sync
    Unsupported,
}

/// Target that accepts and drops every byte
#[derive(Debug, Default)]
pub struct DiscardTarget {
    bytes: u64,
}

impl DiscardTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes dropped so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Write for DiscardTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Target for DiscardTarget {
    fn sync(&mut self) -> Result<SyncOutcome> {
        Ok(SyncOutcome::Unsupported)
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "discard".to_string()
    }
}

pub mod file;

pub use file::FileTarget;
