use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use memchr::memchr;
use min_ini_ports::storage::{IniStorage, LineReader, LineWriter, StreamMark};
use min_ini_shared_kernel::{InfraResult, InfrastructureError};

/// Filesystem adapter implementing the `IniStorage` port on top of `std::fs`.
///
/// Writers of the same file are serialised through an exclusive advisory
/// lock on a sibling `<name>.lock` file. The lock file is left in place so
/// that every writer always locks the same inode.
#[derive(Debug, Clone, Copy)]
pub struct FsStorage {
    advisory_locks: bool,
}

impl Default for FsStorage {
    fn default() -> Self {
        Self { advisory_locks: true }
    }
}

impl FsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that never creates lock files; for read-mostly media or when
    /// the caller coordinates writers itself.
    pub fn without_locking() -> Self {
        Self { advisory_locks: false }
    }

    pub fn uses_locks(&self) -> bool {
        self.advisory_locks
    }

    /// `settings.ini` -> `settings.ini.lock`
    pub fn lock_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }
}

/// Buffered reader that tracks its own offset so `tell` needs no syscall.
#[derive(Debug)]
pub struct FsReader {
    inner: BufReader<File>,
    path: PathBuf,
    position: u64,
}

impl LineReader for FsReader {
    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize, terminator: u8) -> InfraResult<bool> {
        buf.clear();
        while buf.len() < limit {
            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(InfrastructureError::FileRead { path: self.path.clone(), source }),
            };
            if available.is_empty() {
                break;
            }
            let window = &available[..available.len().min(limit - buf.len())];
            let (taken, complete) = match memchr(terminator, window) {
                Some(idx) => (idx + 1, true),
                None => (window.len(), false),
            };
            buf.extend_from_slice(&window[..taken]);
            self.inner.consume(taken);
            self.position += taken as u64;
            if complete {
                break;
            }
        }
        Ok(!buf.is_empty())
    }

    fn tell(&self) -> StreamMark {
        StreamMark::new(self.position)
    }

    fn seek(&mut self, mark: StreamMark) -> InfraResult<()> {
        self.inner
            .seek(SeekFrom::Start(mark.offset()))
            .map_err(|source| InfrastructureError::FileRead { path: self.path.clone(), source })?;
        self.position = mark.offset();
        Ok(())
    }
}

/// Unbuffered writer; the engine batches its own writes.
#[derive(Debug)]
pub struct FsWriter {
    file: File,
    path: PathBuf,
}

impl LineWriter for FsWriter {
    fn write_all(&mut self, bytes: &[u8]) -> InfraResult<()> {
        self.file
            .write_all(bytes)
            .map_err(|source| InfrastructureError::FileWrite { path: self.path.clone(), source })
    }

    fn seek(&mut self, mark: StreamMark) -> InfraResult<()> {
        self.file
            .seek(SeekFrom::Start(mark.offset()))
            .map(|_| ())
            .map_err(|source| InfrastructureError::FileWrite { path: self.path.clone(), source })
    }

    fn close(self) -> InfraResult<()> {
        self.file.sync_all().map_err(|source| InfrastructureError::FileWrite { path: self.path, source })
    }
}

/// Exclusive advisory lock; released when dropped.
#[derive(Debug)]
pub struct FsLock {
    file: Option<File>,
    path: PathBuf,
}

impl Drop for FsLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file
            && let Err(err) = FileExt::unlock(file)
        {
            log::warn!("failed to release lock {}: {err}", self.path.display());
        }
    }
}

impl IniStorage for FsStorage {
    type Reader = FsReader;
    type Writer = FsWriter;
    type Lock = FsLock;

    fn open_read(&self, path: &Path) -> InfraResult<Option<FsReader>> {
        match File::open(path) {
            Ok(file) => Ok(Some(FsReader { inner: BufReader::new(file), path: path.to_path_buf(), position: 0 })),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(InfrastructureError::FileRead { path: path.to_path_buf(), source }),
        }
    }

    fn open_write(&self, path: &Path) -> InfraResult<FsWriter> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map(|file| FsWriter { file, path: path.to_path_buf() })
            .map_err(|source| InfrastructureError::FileWrite { path: path.to_path_buf(), source })
    }

    fn open_rewrite(&self, path: &Path) -> InfraResult<FsWriter> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(|file| FsWriter { file, path: path.to_path_buf() })
            .map_err(|source| InfrastructureError::FileWrite { path: path.to_path_buf(), source })
    }

    fn lock(&self, path: &Path) -> InfraResult<FsLock> {
        let lock_path = Self::lock_path(path);
        if !self.advisory_locks {
            return Ok(FsLock { file: None, path: lock_path });
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| InfrastructureError::Lock { path: lock_path.clone(), source })?;
        FileExt::lock_exclusive(&file)
            .map_err(|source| InfrastructureError::Lock { path: lock_path.clone(), source })?;
        Ok(FsLock { file: Some(file), path: lock_path })
    }

    fn remove(&self, path: &Path) -> InfraResult<()> {
        fs::remove_file(path).map_err(|source| InfrastructureError::FileSystemOperation {
            operation: "remove".to_string(),
            path: path.to_path_buf(),
            source,
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> InfraResult<()> {
        fs::rename(from, to).map_err(|source| InfrastructureError::FileSystemOperation {
            operation: format!("rename to '{}'", to.display()),
            path: from.to_path_buf(),
            source,
        })?;

        // Make the rename durable; best-effort.
        #[cfg(unix)]
        {
            if let Some(parent) = to.parent()
                && let Ok(dir) = File::open(if parent.as_os_str().is_empty() { Path::new(".") } else { parent })
            {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}
