//! Whole-file traversal.

use std::ops::ControlFlow;

use min_ini_ports::storage::LineReader;
use min_ini_shared_kernel::Result;

use crate::{
    scanner::{LineKind, LineScanner, split_pair},
    text::{QuoteMode, clean_value, copy_with_quoting, skip_leading},
};

/// One key/value pair as seen by a browse callback.
///
/// `section` is empty for keys in the global area. Text that is not valid
/// UTF-8 is passed through lossily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IniEntry<'a> {
    pub section: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

/// Calls `visit` for every key/value pair in file order until it breaks.
pub fn browse<R, F>(scanner: &mut LineScanner<R>, maxlen: usize, mut visit: F) -> Result<()>
where
    R: LineReader,
    F: FnMut(&IniEntry<'_>) -> ControlFlow<()>,
{
    let mut section = Vec::new();
    let mut key = Vec::new();
    let mut value = Vec::new();

    while scanner.advance()? {
        let (found, raw) = match scanner.kind() {
            LineKind::Section(name) => {
                copy_with_quoting(&mut section, name, maxlen, QuoteMode::None);
                continue;
            }
            LineKind::Pair { key: found, value: raw } => (found, raw),
            // a `[` line without `]` is not a header, but may still hold a pair
            LineKind::UnclosedSection => match split_pair(scanner.line()) {
                Some(pair) => pair,
                None => continue,
            },
            LineKind::Blank | LineKind::Comment | LineKind::Other => continue,
        };
        copy_with_quoting(&mut key, found, maxlen, QuoteMode::None);
        let (cleaned, mode) = clean_value(skip_leading(raw));
        copy_with_quoting(&mut value, cleaned, maxlen, mode);

        let section = String::from_utf8_lossy(&section);
        let key = String::from_utf8_lossy(&key);
        let value = String::from_utf8_lossy(&value);
        let entry = IniEntry { section: &section, key: &key, value: &value };
        if visit(&entry).is_break() {
            break;
        }
    }
    Ok(())
}
