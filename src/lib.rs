//! iosink - stream uploads into storage and measure write throughput
//!
//! iosink copies a byte stream (a file, stdin, or a generated payload) into an
//! output file or device through a double-buffered pipeline: one thread reads
//! blocks from the source while another writes the previous blocks to the
//! output. The time spent in each phase is recorded so the upload rate can be
//! attributed to the source or the storage.
//!
//! # Architecture
//!
//! - **Pipeline**: reader / writer stages sharing a bounded pool of aligned buffers
//! - **Stages**: metered reader and writer with optional rate ceilings
//! - **Targets**: regular files, block devices (O_DIRECT), or an in-process sink
//! - **Transfer**: one upload end to end, including sync and reporting

pub mod config;
pub mod pipeline;
pub mod stage;
pub mod target;
pub mod transfer;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{CopyConfig, CopyError, CopyStats, Pipeline};
pub use transfer::{Transfer, TransferReport};

/// Result type used throughout iosink
pub type Result<T> = anyhow::Result<T>;
