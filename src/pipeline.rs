//! Double-buffered copy engine
//!
//! `Pipeline::copy` moves a stream from a source to a sink with two stages:
//! the calling thread fills blocks from the source, a scoped writer thread
//! drains them into the sink. Blocks come from a `BufferPool` of `pool_size`
//! aligned buffers and travel to the writer over a work channel of the same
//! capacity, so the reader is never more than `pool_size` blocks ahead.
//!
//! # Shutdown
//!
//! - The reader drops the work sender when it stops. That is the only signal
//!   the writer waits for.
//! - The writer closes the pool when it stops. A reader blocked on `acquire`
//!   after a write failure wakes up with `None`; a reader that already holds
//!   a block finds the work channel disconnected.
//!
//! Both signals fire exactly once, whatever the order of failures.
//!
//! # Example
//!
//! ```
//! use iosink::pipeline::{CopyConfig, Pipeline};
//!
//! let payload = vec![7u8; 3 * 4096 + 100];
//! let mut src = &payload[..];
//! let mut dst = Vec::new();
//!
//! let pipeline = Pipeline::new(CopyConfig { block_size: 4096, ..Default::default() });
//! let stats = pipeline.copy(&mut dst, &mut src).unwrap();
//!
//! assert_eq!(stats.written, payload.len() as u64);
//! assert_eq!(dst, payload);
//! ```

use crate::stage::{read_full, Fill};
use crate::util::buffer::Buffer;
use crate::util::pool::BufferPool;
use crossbeam::channel::{self, Receiver};
use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Default block size (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;
/// Default number of blocks in flight
pub const DEFAULT_POOL_SIZE: usize = 2;
/// Buffer alignment accepted by direct IO on common devices
pub const DEFAULT_ALIGNMENT: usize = 512;

/// Block geometry for one copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Bytes per block
    pub block_size: usize,
    /// Number of blocks circulating between the stages
    pub pool_size: usize,
    /// Start-address alignment of every block
    pub alignment: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            alignment: DEFAULT_ALIGNMENT,
        }
    }
}

/// What one copy did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CopyStats {
    /// Bytes the sink accepted
    pub written: u64,
    /// Blocks handed to the sink
    pub blocks: u64,
    /// Time the reader spent waiting for a free block
    pub read_wait: Duration,
    /// Time the writer spent waiting for a filled block
    pub write_wait: Duration,
    /// Wall time of the whole copy
    pub elapsed: Duration,
}

/// Why a copy stopped early
///
/// `written()` is the number of bytes the sink had accepted in whole blocks
/// when the copy stopped.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The writer thread could not be started; nothing was copied
    #[error("failed to start writer thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("read failed after {written} bytes were written: {source}")]
    Read {
        written: u64,
        #[source]
        source: io::Error,
    },

    #[error("write failed after {written} bytes: {source}")]
    Write {
        written: u64,
        #[source]
        source: io::Error,
    },

    #[error("short write: sink accepted {accepted} of {requested} bytes")]
    ShortWrite {
        written: u64,
        accepted: usize,
        requested: usize,
    },
}

impl CopyError {
    /// Bytes the sink accepted before the copy stopped
    pub fn written(&self) -> u64 {
        match self {
            CopyError::Spawn(_) => 0,
            CopyError::Read { written, .. }
            | CopyError::Write { written, .. }
            | CopyError::ShortWrite { written, .. } => *written,
        }
    }
}

/// Result of the write stage
#[derive(Default)]
struct Drained {
    written: u64,
    blocks: u64,
    wait: Duration,
    error: Option<CopyError>,
}

/// Two-stage copy engine
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: CopyConfig,
}

impl Pipeline {
    pub fn new(config: CopyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Copy `src` into `dst` until the source ends or either side fails
    ///
    /// A clean end of stream is success. A read error takes precedence over a
    /// write error; in both cases the error carries the writer's byte count.
    ///
    /// # Panics
    /// Panics if the block size or pool size is 0, or the alignment is not a
    /// power of two.
    pub fn copy<W, R>(&self, dst: &mut W, src: &mut R) -> Result<CopyStats, CopyError>
    where
        W: Write + Send + ?Sized,
        R: Read + ?Sized,
    {
        let CopyConfig {
            block_size,
            pool_size,
            alignment,
        } = self.config;
        let started = Instant::now();
        let pool = BufferPool::new(pool_size, block_size, alignment);
        let (work_tx, work_rx) = channel::bounded::<Buffer>(pool_size);

        let (read_error, read_wait, drained) = thread::scope(|s| {
            let pool = &pool;
            let writer = thread::Builder::new()
                .name("iosink-writer".to_string())
                .spawn_scoped(s, move || write_stage(dst, work_rx, pool));
            let writer = match writer {
                Ok(handle) => handle,
                Err(e) => {
                    return (
                        None,
                        Duration::ZERO,
                        Drained {
                            error: Some(CopyError::Spawn(e)),
                            ..Default::default()
                        },
                    );
                }
            };

            let mut read_error = None;
            let mut read_wait = Duration::ZERO;
            loop {
                let waiting = Instant::now();
                let Some(mut block) = pool.acquire() else {
                    debug!("Pool closed, reader stopping");
                    break;
                };
                read_wait += waiting.elapsed();

                let (n, end) = read_full(src, block.spare_mut());
                if n > 0 {
                    block.set_len(n);
                    if work_tx.send(block).is_err() {
                        debug!("Writer gone, reader stopping");
                        break;
                    }
                } else {
                    pool.release(block);
                }

                match end {
                    Fill::Full => {}
                    Fill::Eof => break,
                    Fill::Failed(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }
            drop(work_tx);

            let drained = writer
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (read_error, read_wait, drained)
        });

        if let Some(source) = read_error {
            return Err(CopyError::Read {
                written: drained.written,
                source,
            });
        }
        if let Some(e) = drained.error {
            return Err(e);
        }

        let stats = CopyStats {
            written: drained.written,
            blocks: drained.blocks,
            read_wait,
            write_wait: drained.wait,
            elapsed: started.elapsed(),
        };
        debug!(
            "Copied {} bytes in {} blocks (read wait {:.6}s, write wait {:.6}s)",
            stats.written,
            stats.blocks,
            stats.read_wait.as_secs_f64(),
            stats.write_wait.as_secs_f64()
        );
        Ok(stats)
    }
}

/// Copy with the default pool size and alignment
pub fn copy<W, R>(dst: &mut W, src: &mut R, block_size: usize) -> Result<CopyStats, CopyError>
where
    W: Write + Send + ?Sized,
    R: Read + ?Sized,
{
    Pipeline::new(CopyConfig {
        block_size,
        ..Default::default()
    })
    .copy(dst, src)
}

/// Drain filled blocks into `dst` until the reader hangs up or a write fails
fn write_stage<W: Write + ?Sized>(dst: &mut W, work: Receiver<Buffer>, pool: &BufferPool) -> Drained {
    let mut drained = Drained::default();

    loop {
        let waiting = Instant::now();
        let Ok(block) = work.recv() else {
            break;
        };
        drained.wait += waiting.elapsed();

        let requested = block.len();
        debug_assert!(requested > 0, "reader handed over an empty block");
        match write_once(dst, block.filled()) {
            Ok(n) => {
                drained.written += n as u64;
                if n != requested {
                    drained.error = Some(CopyError::ShortWrite {
                        written: drained.written,
                        accepted: n,
                        requested,
                    });
                    break;
                }
            }
            Err(source) => {
                drained.error = Some(CopyError::Write {
                    written: drained.written,
                    source,
                });
                break;
            }
        }
        drained.blocks += 1;
        pool.release(block);
    }

    drop(work);
    pool.close();
    drained
}

/// One write call; a signal interruption is not a result
fn write_once<W: Write + ?Sized>(dst: &mut W, buf: &[u8]) -> io::Result<usize> {
    loop {
        match dst.write(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}
