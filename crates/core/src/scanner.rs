//! Line scanner.
//!
//! Pulls one line at a time from a [`LineReader`] into a bounded working
//! buffer and classifies it. The mark of the start of every line is kept so
//! callers can come back to it.

use memchr::memchr;
use min_ini_ports::storage::{LineReader, StreamMark};
use min_ini_shared_kernel::{IniConfig, Result};

use crate::text::{skip_leading, strip_trailing, until_nul};

/// Shape of one raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Comment,
    /// `[name]`, name trimmed.
    Section(&'a [u8]),
    /// Starts with `[` but has no closing `]`. Still ends a section's area.
    UnclosedSection,
    /// `key = value` or `key : value`; key trimmed, value raw (after the separator).
    Pair { key: &'a [u8], value: &'a [u8] },
    Other,
}

/// Classifies a raw line, terminator included.
#[must_use]
pub fn classify(line: &[u8]) -> LineKind<'_> {
    let sp = skip_leading(until_nul(line));
    match sp.first() {
        None => LineKind::Blank,
        Some(b'[') => match sp.iter().rposition(|&b| b == b']') {
            Some(close) => LineKind::Section(strip_trailing(skip_leading(&sp[1..close]))),
            None => LineKind::UnclosedSection,
        },
        Some(b';' | b'#') => LineKind::Comment,
        Some(_) => match split_pair(sp) {
            Some((key, value)) => LineKind::Pair { key, value },
            None => LineKind::Other,
        },
    }
}

/// Splits at the first `=`, or failing that the first `:`, ignoring what the
/// line starts with.
#[must_use]
pub fn split_pair(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let sp = skip_leading(until_nul(line));
    let sep = memchr(b'=', sp).or_else(|| memchr(b':', sp))?;
    Some((strip_trailing(&sp[..sep]), &sp[sep + 1..]))
}

#[derive(Debug)]
pub struct LineScanner<R> {
    reader: R,
    line: Vec<u8>,
    limit: usize,
    terminator: u8,
    start: StreamMark,
}

impl<R: LineReader> LineScanner<R> {
    pub fn new(reader: R, config: &IniConfig) -> Self {
        Self {
            start: reader.tell(),
            reader,
            line: Vec::with_capacity(config.buffer_capacity),
            limit: config.read_limit(),
            terminator: config.terminator_byte(),
        }
    }

    /// Reads the next line; `false` once the stream is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        self.start = self.reader.tell();
        Ok(self.reader.read_line(&mut self.line, self.limit, self.terminator)?)
    }

    /// Reads at most `limit` raw bytes (clamped to the buffer) into the line
    /// buffer, for copying rather than parsing.
    pub fn advance_raw(&mut self, limit: usize) -> Result<bool> {
        self.start = self.reader.tell();
        Ok(self.reader.read_line(&mut self.line, limit.min(self.limit), self.terminator)?)
    }

    pub fn line(&self) -> &[u8] {
        &self.line
    }

    pub fn kind(&self) -> LineKind<'_> {
        classify(&self.line)
    }

    /// Mark of the start of the current line.
    pub fn line_start(&self) -> StreamMark {
        self.start
    }

    /// Mark just past the current line.
    pub fn position(&self) -> StreamMark {
        self.reader.tell()
    }

    /// Whether the current line was read up to and including its terminator.
    pub fn line_is_complete(&self) -> bool {
        self.line.last() == Some(&self.terminator)
    }

    pub fn seek(&mut self, mark: StreamMark) -> Result<()> {
        self.reader.seek(mark)?;
        self.start = mark;
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
