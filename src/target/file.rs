//! File target implementation
//!
//! Regular files and devices, optionally opened with O_DIRECT. The file is
//! opened read-write and written from offset 0; it is not created or
//! truncated unless asked, so a device node or `/dev/null` works as-is.
//!
//! # Example
//!
//! ```no_run
//! use iosink::target::{FileTarget, OpenFlags, Target};
//! use std::io::Write;
//!
//! let mut target = FileTarget::open("/dev/null", OpenFlags::default()).unwrap();
//! target.write_all(b"payload").unwrap();
//! target.sync().unwrap();
//! Box::new(target).close().unwrap();
//! ```

use super::{OpenFlags, SyncOutcome, Target};
use crate::Result;
use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::IntoRawFd;
use std::path::{Path, PathBuf};

/// File or device target
#[derive(Debug)]
pub struct FileTarget {
    path: PathBuf,
    file: File,
    flags: OpenFlags,
}

impl FileTarget {
    /// Open `path` for writing with the given flags
    pub fn open(path: impl AsRef<Path>, flags: OpenFlags) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.read(true).write(true);

        if flags.create {
            options.create(true);
        }

        if flags.truncate {
            options.truncate(true);
        }

        if flags.direct {
            options.custom_flags(libc::O_DIRECT);
        }

        let file = options
            .open(&path)
            .with_context(|| format!("Failed to open output: {}", path.display()))?;

        Ok(Self { path, file, flags })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file was opened with O_DIRECT
    pub fn is_direct(&self) -> bool {
        self.flags.direct
    }
}

/// Whether a sync failure means "this target cannot be synced"
fn sync_unsupported(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINVAL)
}

impl Write for FileTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Target for FileTarget {
    fn sync(&mut self) -> Result<SyncOutcome> {
        match self.file.sync_all() {
            Ok(()) => Ok(SyncOutcome::Synced),
            Err(e) if sync_unsupported(&e) => Ok(SyncOutcome::Unsupported),
            Err(e) => Err(e).with_context(|| format!("fsync failed: path={}", self.path.display())),
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        let FileTarget { path, file, .. } = *self;
        let fd = file.into_raw_fd();
        // SAFETY: `into_raw_fd` gave us sole ownership of the descriptor.
        let result = unsafe { libc::close(fd) };
        if result < 0 {
            let err = io::Error::last_os_error();
            return Err(err).context(format!("close failed: path={}", path.display()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.flags.direct {
            format!("{} (direct)", self.path.display())
        } else {
            self.path.display().to_string()
        }
    }
}
