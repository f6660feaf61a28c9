//! In-memory storage.
//!
//! Clones share the same files, so a test (or a firmware image loader) can keep
//! one handle for inspection while the engine works through another. Fault
//! injection hooks make it possible to check what a rewrite leaves behind when
//! the platform fails halfway.

use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use memchr::memchr;
use min_ini_ports::storage::{IniStorage, LineReader, LineWriter, StreamMark};
use min_ini_shared_kernel::{InfraResult, InfrastructureError};

#[derive(Debug, Default)]
struct Volume {
    files: HashMap<PathBuf, Vec<u8>>,
    failing_opens: HashSet<PathBuf>,
    failing_writes: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    volume: Arc<Mutex<Volume>>,
}

fn lock_volume(volume: &Mutex<Volume>) -> MutexGuard<'_, Volume> {
    volume.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(path: &Path) -> io::Error {
    io::Error::other(format!("injected failure for {}", path.display()))
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        lock_volume(&self.volume).files.insert(path.into(), contents.into());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        lock_volume(&self.volume).files.get(path).cloned()
    }

    pub fn exists(&self, path: &Path) -> bool {
        lock_volume(&self.volume).files.contains_key(path)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = lock_volume(&self.volume).files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Makes every later attempt to open `path` for writing fail.
    pub fn fail_opens_for(&self, path: impl Into<PathBuf>) {
        lock_volume(&self.volume).failing_opens.insert(path.into());
    }

    /// Lets `path` be opened for writing but makes every write to it fail.
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        lock_volume(&self.volume).failing_writes.insert(path.into());
    }

    fn writer(&self, path: &Path, truncate: bool) -> InfraResult<MemoryWriter> {
        let mut volume = lock_volume(&self.volume);
        if volume.failing_opens.contains(path) {
            return Err(InfrastructureError::FileWrite { path: path.to_path_buf(), source: injected(path) });
        }
        if truncate {
            volume.files.insert(path.to_path_buf(), Vec::new());
        } else if !volume.files.contains_key(path) {
            return Err(InfrastructureError::FileWrite {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(MemoryWriter { volume: Arc::clone(&self.volume), path: path.to_path_buf(), position: 0 })
    }
}

/// Reads from a snapshot taken when the file was opened.
#[derive(Debug)]
pub struct MemoryReader {
    data: Vec<u8>,
    position: usize,
}

impl LineReader for MemoryReader {
    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize, terminator: u8) -> InfraResult<bool> {
        buf.clear();
        let rest = &self.data[self.position.min(self.data.len())..];
        let window = &rest[..rest.len().min(limit)];
        let taken = memchr(terminator, window).map_or(window.len(), |idx| idx + 1);
        buf.extend_from_slice(&window[..taken]);
        self.position += taken;
        Ok(taken > 0)
    }

    fn tell(&self) -> StreamMark {
        StreamMark::new(self.position as u64)
    }

    fn seek(&mut self, mark: StreamMark) -> InfraResult<()> {
        self.position = usize::try_from(mark.offset()).unwrap_or(usize::MAX);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryWriter {
    volume: Arc<Mutex<Volume>>,
    path: PathBuf,
    position: usize,
}

impl LineWriter for MemoryWriter {
    fn write_all(&mut self, bytes: &[u8]) -> InfraResult<()> {
        let mut volume = lock_volume(&self.volume);
        if volume.failing_writes.contains(&self.path) {
            return Err(InfrastructureError::FileWrite { path: self.path.clone(), source: injected(&self.path) });
        }
        let file = volume.files.entry(self.path.clone()).or_default();
        let end = self.position + bytes.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    fn seek(&mut self, mark: StreamMark) -> InfraResult<()> {
        self.position = usize::try_from(mark.offset()).unwrap_or(usize::MAX);
        Ok(())
    }

    fn close(self) -> InfraResult<()> {
        Ok(())
    }
}

impl IniStorage for MemoryStorage {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;
    type Lock = ();

    fn open_read(&self, path: &Path) -> InfraResult<Option<MemoryReader>> {
        Ok(self.contents(path).map(|data| MemoryReader { data, position: 0 }))
    }

    fn open_write(&self, path: &Path) -> InfraResult<MemoryWriter> {
        self.writer(path, true)
    }

    fn open_rewrite(&self, path: &Path) -> InfraResult<MemoryWriter> {
        self.writer(path, false)
    }

    fn lock(&self, _path: &Path) -> InfraResult<()> {
        Ok(())
    }

    fn remove(&self, path: &Path) -> InfraResult<()> {
        match lock_volume(&self.volume).files.remove(path) {
            Some(_) => Ok(()),
            None => Err(InfrastructureError::FileSystemOperation {
                operation: "remove".to_string(),
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> InfraResult<()> {
        let mut volume = lock_volume(&self.volume);
        let Some(data) = volume.files.remove(from) else {
            return Err(InfrastructureError::FileSystemOperation {
                operation: format!("rename to '{}'", to.display()),
                path: from.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        };
        volume.files.insert(to.to_path_buf(), data);
        Ok(())
    }
}
