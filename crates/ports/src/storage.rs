use std::{fmt, path::Path};

use min_ini_shared_kernel::InfraResult;

/// Byte offset into an open stream, as returned by `tell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct StreamMark(u64);

impl StreamMark {
    pub const START: Self = Self(0);

    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> u64 {
        self.0
    }

    /// Number of bytes between `earlier` and `self` (zero if `earlier` is ahead).
    pub const fn distance_from(self, earlier: StreamMark) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub const fn advanced(self, bytes: u64) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Display for StreamMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Read side of an open file.
pub trait LineReader {
    /// Reads one line into `buf`, replacing its contents.
    ///
    /// Stops after `terminator` or after `limit` bytes, whichever comes
    /// first. A last line without a terminator is returned once. Returns
    /// `false` when nothing could be read.
    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize, terminator: u8) -> InfraResult<bool>;

    fn tell(&self) -> StreamMark;

    fn seek(&mut self, mark: StreamMark) -> InfraResult<()>;
}

/// Write side of an open file.
pub trait LineWriter {
    fn write_all(&mut self, bytes: &[u8]) -> InfraResult<()>;

    fn seek(&mut self, mark: StreamMark) -> InfraResult<()>;

    /// Flushes everything written so far to the medium and releases the handle.
    fn close(self) -> InfraResult<()>
    where
        Self: Sized;
}

/// File-level operations the engine needs from its platform.
pub trait IniStorage {
    type Reader: LineReader;
    type Writer: LineWriter;
    /// Held for the duration of one mutating call; released on drop.
    type Lock;

    /// Opens `path` for reading, or `None` when it does not exist.
    fn open_read(&self, path: &Path) -> InfraResult<Option<Self::Reader>>;

    /// Creates or truncates `path`.
    fn open_write(&self, path: &Path) -> InfraResult<Self::Writer>;

    /// Opens an existing `path` for overwriting in place, without truncation.
    fn open_rewrite(&self, path: &Path) -> InfraResult<Self::Writer>;

    /// Serialises writers of the same file. May block.
    fn lock(&self, path: &Path) -> InfraResult<Self::Lock>;

    fn remove(&self, path: &Path) -> InfraResult<()>;

    /// Moves `from` over `to`, replacing it atomically.
    fn rename(&self, from: &Path, to: &Path) -> InfraResult<()>;
}
