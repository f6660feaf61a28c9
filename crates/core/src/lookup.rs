//! Lookup engine: locates a section, then a key (or an index) inside it.

use min_ini_ports::storage::{LineReader, StreamMark};
use min_ini_shared_kernel::Result;

use crate::{
    scanner::{LineKind, LineScanner},
    text::{QuoteMode, clean_value, copy_with_quoting, names_match, skip_leading, trim},
};

/// Which section a lookup runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionQuery<'a> {
    /// Lines before the first section header.
    Global,
    /// Case-insensitive name match.
    Named(&'a [u8]),
    /// The n-th section header in the file (zero based).
    Index(usize),
}

impl<'a> SectionQuery<'a> {
    /// `None` and blank names select the global area; names are trimmed.
    pub fn from_name(name: Option<&'a str>) -> Self {
        match name.map(|n| trim(n.as_bytes())) {
            Some(name) if !name.is_empty() => Self::Named(name),
            _ => Self::Global,
        }
    }
}

/// What to look for once the section is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyQuery<'a> {
    Named(&'a [u8]),
    /// The n-th key of the section (zero based).
    Index(usize),
    /// Stop at the section itself.
    SectionOnly,
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Value, key name or section name, depending on the query.
    pub text: Vec<u8>,
    /// Where the matching line starts.
    pub line_start: StreamMark,
    /// The matching line was read through its terminator.
    pub complete: bool,
}

fn hit_here<R: LineReader>(scanner: &LineScanner<R>, text: Vec<u8>) -> Hit {
    Hit { text, line_start: scanner.line_start(), complete: scanner.line_is_complete() }
}

/// Runs one lookup from the scanner's current position.
///
/// Returned text is bounded by `maxlen` the way [`copy_with_quoting`] bounds
/// it. After a hit the scanner sits just past the matching line.
pub fn find_entry<R: LineReader>(
    scanner: &mut LineScanner<R>,
    section: SectionQuery<'_>,
    key: KeyQuery<'_>,
    maxlen: usize,
) -> Result<Option<Hit>> {
    let mut text = Vec::new();

    if !matches!(section, SectionQuery::Global) {
        let mut index = 0;
        loop {
            if !scanner.advance()? {
                return Ok(None);
            }
            let LineKind::Section(name) = scanner.kind() else {
                continue;
            };
            match section {
                SectionQuery::Named(wanted) if names_match(name, wanted) => break,
                SectionQuery::Index(wanted) => {
                    if index == wanted {
                        copy_with_quoting(&mut text, name, maxlen, QuoteMode::None);
                        return Ok(Some(hit_here(scanner, text)));
                    }
                    index += 1;
                }
                _ => {}
            }
        }
    }

    match key {
        KeyQuery::SectionOnly => return Ok(Some(hit_here(scanner, text))),
        KeyQuery::Named(wanted) if wanted.is_empty() => return Ok(None),
        _ => {}
    }

    let mut index = 0;
    while scanner.advance()? {
        match scanner.kind() {
            LineKind::Section(_) | LineKind::UnclosedSection => return Ok(None),
            LineKind::Pair { key: found, value } => match key {
                KeyQuery::Named(wanted) if names_match(found, wanted) => {
                    let (cleaned, mode) = clean_value(skip_leading(value));
                    copy_with_quoting(&mut text, cleaned, maxlen, mode);
                    return Ok(Some(hit_here(scanner, text)));
                }
                KeyQuery::Index(wanted) => {
                    if index == wanted {
                        copy_with_quoting(&mut text, found, maxlen, QuoteMode::None);
                        return Ok(Some(hit_here(scanner, text)));
                    }
                    index += 1;
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok(None)
}
