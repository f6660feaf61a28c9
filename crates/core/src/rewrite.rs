//! Rewrite engine.
//!
//! A mutation either patches the matching line in place, when the new line
//! has exactly the length of the old one, or streams the file into a sibling
//! temporary file with the change spliced in and renames it over the
//! original. Unchanged lines are not copied one by one: their byte range is
//! accumulated and copied in batches of at most one buffer.
//!
//! The original file is never modified until the replacement is complete.

use std::{
    io,
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};
use min_ini_ports::storage::{IniStorage, LineReader, LineWriter, StreamMark};
use min_ini_shared_kernel::{ErrorContext, IniConfig, InfrastructureError, Result};

use crate::{
    lookup::{KeyQuery, SectionQuery, find_entry},
    scanner::{LineKind, LineScanner},
    text::{QuoteMode, check_enquote, copy_with_quoting, names_match},
};

/// A single mutation of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a> {
    /// Replace the key's value, or add the key (and the section) if missing.
    Set { key: &'a [u8], value: &'a [u8] },
    DeleteKey { key: &'a [u8] },
    /// Drop the header and every line up to the next header.
    DeleteSection,
}

impl Edit<'_> {
    fn key(&self) -> Option<&[u8]> {
        match self {
            Self::Set { key, .. } | Self::DeleteKey { key } => Some(*key),
            Self::DeleteSection => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::DeleteKey { .. } => "delete key",
            Self::DeleteSection => "delete section",
        }
    }
}

/// Sibling path used while rewriting: the last character becomes `~`, or a
/// `~` is appended when the name already ends in one.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) if !text.ends_with('~') => {
            let mut name = text.to_string();
            name.pop();
            name.push('~');
            PathBuf::from(name)
        }
        _ => {
            let mut name = path.as_os_str().to_owned();
            name.push("~");
            PathBuf::from(name)
        }
    }
}

/// `[name]` plus terminator, sized to fit one line read.
pub fn format_section_line(out: &mut Vec<u8>, name: &[u8], config: &IniConfig) {
    let terminator = config.terminator();
    copy_with_quoting(out, name, config.buffer_capacity.saturating_sub(2 + terminator.len()), QuoteMode::None);
    out.insert(0, b'[');
    out.push(b']');
    out.extend_from_slice(terminator);
}

/// `key = value` plus terminator, sized to fit one line read. The value is
/// quoted when it would not read back unchanged otherwise.
pub fn format_key_line(out: &mut Vec<u8>, key: &[u8], value: &[u8], config: &IniConfig) {
    let terminator = config.terminator();
    let capacity = config.buffer_capacity;

    copy_with_quoting(out, key, capacity.saturating_sub(4 + terminator.len()), QuoteMode::None);
    out.extend_from_slice(b" = ");

    let mut quoted = Vec::new();
    let room = capacity.saturating_sub(1 + terminator.len() + out.len());
    copy_with_quoting(&mut quoted, value, room, check_enquote(value));
    out.extend_from_slice(&quoted);
    out.extend_from_slice(terminator);
}

/// Applies `edit` to `section` (`None` for the global area) of the file at `path`.
pub fn apply<S: IniStorage>(
    storage: &S,
    config: &IniConfig,
    path: &Path,
    section: Option<&[u8]>,
    edit: Edit<'_>,
) -> Result<()> {
    config.validate()?;
    let _lock = storage.lock(path)?;

    let Some(reader) = storage.open_read(path)? else {
        return create_fresh(storage, config, path, section, edit);
    };
    let query = section.map_or(SectionQuery::Global, SectionQuery::Named);
    let mut scanner = LineScanner::new(reader, config);

    match edit {
        Edit::Set { key, value } => {
            if let Some(hit) = find_entry(&mut scanner, query, KeyQuery::Named(key), config.buffer_capacity)? {
                if hit.text == value {
                    debug!("{}: value unchanged, nothing to write", path.display());
                    return Ok(());
                }
                let tail = scanner.position();
                drop(scanner);
                let mut line = Vec::with_capacity(config.buffer_capacity);
                format_key_line(&mut line, key, value, config);
                if hit.complete && tail.distance_from(hit.line_start) == line.len() as u64 {
                    return patch_in_place(storage, path, hit.line_start, &line);
                }
            }
        }
        Edit::DeleteKey { key } => {
            if find_entry(&mut scanner, query, KeyQuery::Named(key), 1)?.is_none() {
                debug!("{}: no such key, nothing to delete", path.display());
                return Ok(());
            }
        }
        Edit::DeleteSection if section.is_none() => {
            let has_global_lines =
                scanner.advance()? && !matches!(scanner.kind(), LineKind::Section(_) | LineKind::UnclosedSection);
            if !has_global_lines {
                debug!("{}: nothing before the first section, nothing to delete", path.display());
                return Ok(());
            }
        }
        Edit::DeleteSection => {
            if find_entry(&mut scanner, query, KeyQuery::SectionOnly, 1)?.is_none() {
                debug!("{}: no such section, nothing to delete", path.display());
                return Ok(());
            }
        }
    }

    replace_via_temp(storage, config, path, section, edit)
        .with_context(|| format!("Failed to {} in '{}'", edit.name(), path.display()))
}

fn create_fresh<S: IniStorage>(
    storage: &S,
    config: &IniConfig,
    path: &Path,
    section: Option<&[u8]>,
    edit: Edit<'_>,
) -> Result<()> {
    let Edit::Set { key, value } = edit else {
        debug!("{}: file does not exist, nothing to delete", path.display());
        return Ok(());
    };
    debug!("{}: creating new file", path.display());
    let mut writer = storage.open_write(path)?;
    write_new_entry(&mut writer, config, section, key, value)?;
    writer.close()?;
    Ok(())
}

fn write_new_entry<W: LineWriter>(
    writer: &mut W,
    config: &IniConfig,
    section: Option<&[u8]>,
    key: &[u8],
    value: &[u8],
) -> Result<()> {
    let mut line = Vec::with_capacity(config.buffer_capacity);
    if let Some(name) = section {
        format_section_line(&mut line, name, config);
        writer.write_all(&line)?;
    }
    format_key_line(&mut line, key, value, config);
    writer.write_all(&line)?;
    Ok(())
}

fn patch_in_place<S: IniStorage>(storage: &S, path: &Path, at: StreamMark, line: &[u8]) -> Result<()> {
    debug!("{}: same-length update, patching {} bytes {at}", path.display(), line.len());
    let mut writer = storage.open_rewrite(path)?;
    writer.seek(at)?;
    writer.write_all(line)?;
    writer.close()?;
    Ok(())
}

fn replace_via_temp<S: IniStorage>(
    storage: &S,
    config: &IniConfig,
    path: &Path,
    section: Option<&[u8]>,
    edit: Edit<'_>,
) -> Result<()> {
    let temp = temp_path(path);
    debug!("{}: rewriting through {}", path.display(), temp.display());
    let mut writer = storage.open_write(&temp)?;

    let outcome = match storage.open_read(path) {
        Ok(Some(reader)) => Splice::new(reader, &mut writer, config, path).run(section, edit).map(|()| true),
        Ok(None) => match edit {
            // removed behind our back; fall back to a fresh file
            Edit::Set { key, value } => write_new_entry(&mut writer, config, section, key, value).map(|()| true),
            Edit::DeleteKey { .. } | Edit::DeleteSection => Ok(false),
        },
        Err(err) => Err(err.into()),
    };

    let finished = outcome.and_then(|replace| {
        writer.close()?;
        if replace {
            storage.rename(&temp, path)?;
        } else {
            storage.remove(&temp)?;
        }
        Ok(())
    });

    if finished.is_err() {
        discard(storage, &temp);
    }
    finished
}

fn discard<S: IniStorage>(storage: &S, temp: &Path) {
    if let Err(err) = storage.remove(temp) {
        warn!("failed to remove temporary file {}: {err}", temp.display());
    }
}

/// Byte range of source lines waiting to be copied.
#[derive(Debug)]
struct CopyCache {
    mark: StreamMark,
    pending: usize,
    capacity: usize,
}

impl CopyCache {
    fn accumulate(&mut self, len: usize) -> bool {
        if self.pending + len >= self.capacity {
            return false;
        }
        self.pending += len;
        true
    }
}

/// Destination stream that remembers whether it ends on a line boundary.
struct Output<'w, W> {
    writer: &'w mut W,
    terminator: &'w [u8],
    tail: Vec<u8>,
}

impl<W: LineWriter> Output<'_, W> {
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.writer.write_all(bytes)?;
        let keep = self.terminator.len();
        self.tail.extend_from_slice(&bytes[bytes.len().saturating_sub(keep)..]);
        let excess = self.tail.len().saturating_sub(keep);
        self.tail.drain(..excess);
        Ok(())
    }

    fn at_line_start(&self) -> bool {
        self.tail.is_empty() || self.tail == self.terminator
    }
}

/// Streams the source into the destination with one edit spliced in.
struct Splice<'a, R, W> {
    scanner: LineScanner<R>,
    out: Output<'a, W>,
    config: &'a IniConfig,
    path: &'a Path,
    cache: CopyCache,
    batch: Vec<u8>,
}

impl<'a, R: LineReader, W: LineWriter> Splice<'a, R, W> {
    fn new(reader: R, writer: &'a mut W, config: &'a IniConfig, path: &'a Path) -> Self {
        let mark = reader.tell();
        Self {
            scanner: LineScanner::new(reader, config),
            out: Output { writer, terminator: config.terminator(), tail: Vec::new() },
            config,
            path,
            cache: CopyCache { mark, pending: 0, capacity: config.buffer_capacity },
            batch: Vec::with_capacity(config.buffer_capacity),
        }
    }

    fn run(mut self, section: Option<&[u8]>, edit: Edit<'_>) -> Result<()> {
        let config = self.config;
        let terminator = config.terminator();
        let deleting_section = edit == Edit::DeleteSection;

        if let Some(name) = section {
            loop {
                if !self.scanner.advance()? {
                    let at_line_start = self.flush()?;
                    if let Edit::Set { key, value } = edit {
                        if !at_line_start {
                            self.out.emit(terminator)?;
                        }
                        self.emit_section(name)?;
                        self.emit_key(key, value)?;
                    }
                    return Ok(());
                }
                let is_target = matches!(self.scanner.kind(), LineKind::Section(found) if names_match(found, name));
                if !(is_target && deleting_section) {
                    self.carry()?;
                }
                if is_target {
                    break;
                }
            }
            self.flush()?;
            if deleting_section {
                // the header was never cached, so the flush rewound onto it
                self.skip_line()?;
            }
        }

        let boundary = loop {
            if !self.scanner.advance()? {
                let at_line_start = self.flush()?;
                if let Edit::Set { key, value } = edit {
                    if !at_line_start {
                        self.out.emit(terminator)?;
                    }
                    self.emit_key(key, value)?;
                }
                return Ok(());
            }
            match self.scanner.kind() {
                LineKind::Section(_) | LineKind::UnclosedSection => break Boundary::NextSection,
                LineKind::Pair { key: found, .. } if edit.key().is_some_and(|key| names_match(found, key)) => {
                    break Boundary::MatchedKey;
                }
                _ => {}
            }
            if deleting_section {
                self.cache.mark = self.scanner.position();
            } else {
                self.carry()?;
            }
        };

        self.flush()?;
        if let Edit::Set { key, value } = edit {
            self.emit_key(key, value)?;
        }
        match boundary {
            Boundary::NextSection => {
                self.scanner.advance()?;
                self.carry()?;
            }
            Boundary::MatchedKey => self.skip_line()?,
        }

        while self.scanner.advance()? {
            self.carry()?;
        }
        self.flush()?;
        Ok(())
    }

    /// Adds the current line to the pending copy, flushing first if it would not fit.
    fn carry(&mut self) -> Result<()> {
        if !self.cache.accumulate(self.scanner.line().len()) {
            self.flush()?;
            // the flush reused the line buffer; the same line reads back identically
            self.scanner.advance()?;
            let fitted = self.cache.accumulate(self.scanner.line().len());
            debug_assert!(fitted, "a single line always fits an empty cache");
        }
        Ok(())
    }

    /// Reads the line at the cache mark and leaves it out of the copy.
    fn skip_line(&mut self) -> Result<()> {
        self.scanner.advance()?;
        self.cache.mark = self.scanner.position();
        Ok(())
    }

    /// Copies the pending range and reports whether the output now ends a line.
    ///
    /// Leaves the source positioned at the new cache mark.
    fn flush(&mut self) -> Result<bool> {
        let pending = self.cache.pending;
        self.scanner.seek(self.cache.mark)?;
        self.batch.clear();
        while self.batch.len() < pending {
            if !self.scanner.advance_raw(pending - self.batch.len())? {
                return Err(InfrastructureError::FileRead {
                    path: self.path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank while being rewritten"),
                }
                .into());
            }
            self.batch.extend_from_slice(self.scanner.line());
        }
        if !self.batch.is_empty() {
            trace!("{}: copying {} bytes from {}", self.path.display(), self.batch.len(), self.cache.mark);
            self.out.emit(&self.batch)?;
        }
        self.cache.mark = self.scanner.position();
        self.cache.pending = 0;
        Ok(self.out.at_line_start())
    }

    fn emit_section(&mut self, name: &[u8]) -> Result<()> {
        format_section_line(&mut self.batch, name, self.config);
        self.out.emit(&self.batch)
    }

    fn emit_key(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        format_key_line(&mut self.batch, key, value, self.config);
        self.out.emit(&self.batch)
    }
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    NextSection,
    MatchedKey,
}
