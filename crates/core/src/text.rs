//! Byte-level string helpers shared by the scanner and the rewrite engine.
//!
//! Everything here works on single-byte text. A NUL byte ends the text it
//! appears in, the way a terminated string would; nothing past it is ever read.
//! Output produced by [`copy_with_quoting`] is bounded by a `maxlen` that
//! counts one reserved slot, so at most `maxlen - 1` bytes are produced.

use memchr::memchr;

/// How a value is transformed when it is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    /// Plain bounded copy.
    #[default]
    None,
    /// Wrap in `"` and escape inner quotes as `\"` (writing).
    Enquote,
    /// Drop the escape in front of `"` (reading).
    Dequote,
}

/// Whitespace and control bytes, excluding NUL.
#[inline]
#[must_use]
pub const fn is_blank(b: u8) -> bool {
    b != 0 && b <= b' '
}

/// The part of `bytes` before the first NUL.
#[must_use]
pub fn until_nul(bytes: &[u8]) -> &[u8] {
    memchr(0, bytes).map_or(bytes, |idx| &bytes[..idx])
}

#[must_use]
pub fn skip_leading(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&b| !is_blank(b)).unwrap_or(s.len());
    &s[start..]
}

/// End index of `s` once trailing blanks are dropped; never below zero.
#[must_use]
pub fn skip_trailing(s: &[u8]) -> usize {
    s.iter().rposition(|&b| !is_blank(b)).map_or(0, |idx| idx + 1)
}

#[must_use]
pub fn strip_trailing(s: &[u8]) -> &[u8] {
    &s[..skip_trailing(s)]
}

#[must_use]
pub fn trim(s: &[u8]) -> &[u8] {
    strip_trailing(skip_leading(s))
}

/// Case-insensitive (ASCII) comparison that also requires equal length.
#[must_use]
pub fn names_match(found: &[u8], wanted: &[u8]) -> bool {
    found.len() == wanted.len() && found.eq_ignore_ascii_case(wanted)
}

/// Copies `src` into `dest` (replacing its contents) according to `mode`.
///
/// The result never exceeds `maxlen - 1` bytes. Enquoting needs room for two
/// quotes, so with `maxlen < 3` it degrades to a plain copy; when an escape
/// pair no longer fits, the copy stops instead of emitting half of it.
pub fn copy_with_quoting(dest: &mut Vec<u8>, src: &[u8], maxlen: usize, mode: QuoteMode) {
    debug_assert!(maxlen > 0, "copy_with_quoting needs room for at least the reserved slot");
    dest.clear();
    let src = until_nul(src);
    let room = maxlen.saturating_sub(1);
    let mode = if mode == QuoteMode::Enquote && maxlen < 3 { QuoteMode::None } else { mode };

    match mode {
        QuoteMode::None => dest.extend_from_slice(&src[..src.len().min(room)]),
        QuoteMode::Enquote => {
            dest.push(b'"');
            for &b in src {
                if dest.len() >= maxlen - 2 {
                    break;
                }
                if b == b'"' {
                    if dest.len() >= maxlen - 3 {
                        break;
                    }
                    dest.push(b'\\');
                }
                dest.push(b);
            }
            dest.push(b'"');
        }
        QuoteMode::Dequote => {
            let mut s = 0;
            while s < src.len() && dest.len() < room {
                if matches!(src[s], b'"' | b'\\') && src.get(s + 1) == Some(&b'"') {
                    s += 1;
                }
                dest.push(src[s]);
                s += 1;
            }
        }
    }
}

/// Cuts a raw value (the text after `=`/`:`, leading blanks already skipped)
/// down to what a reader should see.
///
/// Truncates at the first `;` or `#` outside a quoted run, trims trailing
/// blanks, and strips one pair of surrounding quotes. `""` and `\"` never
/// toggle the quoted state. The returned mode is `Dequote` when quotes were
/// stripped.
#[must_use]
pub fn clean_value(value: &[u8]) -> (&[u8], QuoteMode) {
    let value = until_nul(value);
    let mut in_string = false;
    let mut end = 0;
    while end < value.len() {
        let b = value[end];
        if matches!(b, b';' | b'#') && !in_string {
            break;
        }
        let next_is_quote = value.get(end + 1) == Some(&b'"');
        if b == b'"' {
            if next_is_quote {
                end += 1;
            } else {
                in_string = !in_string;
            }
        } else if b == b'\\' && next_is_quote {
            end += 1;
        }
        end += 1;
    }

    let cleaned = strip_trailing(&value[..end.min(value.len())]);
    match cleaned {
        [b'"', inner @ .., b'"'] => (inner, QuoteMode::Dequote),
        [b'"'] => (&cleaned[1..], QuoteMode::Dequote),
        _ => (cleaned, QuoteMode::None),
    }
}

/// Whether a value must be quoted to survive a write/read cycle.
#[must_use]
pub fn check_enquote(value: &[u8]) -> QuoteMode {
    let value = until_nul(value);
    let special = value.iter().any(|b| matches!(b, b'"' | b';' | b'#'));
    let padded = value.first().is_some_and(|&b| is_blank(b)) || value.last().is_some_and(|&b| is_blank(b));
    if special || padded { QuoteMode::Enquote } else { QuoteMode::None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy(src: &str, maxlen: usize, mode: QuoteMode) -> String {
        let mut dest = Vec::new();
        copy_with_quoting(&mut dest, src.as_bytes(), maxlen, mode);
        String::from_utf8(dest).unwrap()
    }

    fn clean(raw: &str) -> (String, QuoteMode) {
        let (value, mode) = clean_value(raw.as_bytes());
        (String::from_utf8(value.to_vec()).unwrap(), mode)
    }

    #[test]
    fn whitespace_trimming_stops_at_content() {
        assert_eq!(skip_leading(b" \t x y "), b"x y ");
        assert_eq!(strip_trailing(b" x y \r\n"), b" x y");
        assert_eq!(skip_trailing(b"   "), 0);
        assert_eq!(trim(b"\t[a] \n"), b"[a]");
    }

    #[test]
    fn names_compare_case_insensitively_with_exact_length() {
        assert!(names_match(b"Foo", b"fOO"));
        assert!(!names_match(b"foo", b"foobar"));
        assert!(!names_match(b"foobar", b"foo"));
    }

    #[test]
    fn plain_copy_truncates_and_stops_at_nul() {
        assert_eq!(copy("abcdef", 4, QuoteMode::None), "abc");
        assert_eq!(copy("ab\0cd", 16, QuoteMode::None), "ab");
    }

    #[test]
    fn enquote_escapes_inner_quotes() {
        assert_eq!(copy(r#"say "hi""#, 64, QuoteMode::Enquote), r#""say \"hi\"""#);
    }

    #[test]
    fn enquote_never_splits_an_escape_pair() {
        // room for `"a` + closing quote; the escaped quote would not fit
        assert_eq!(copy(r#"a"b"#, 5, QuoteMode::Enquote), r#""a""#);
    }

    #[test]
    fn enquote_degrades_without_room_for_quotes() {
        assert_eq!(copy("xyz", 2, QuoteMode::Enquote), "x");
    }

    #[test]
    fn dequote_resolves_both_escape_styles() {
        assert_eq!(copy(r#"a\"b""c"#, 64, QuoteMode::Dequote), r#"a"b"c"#);
        assert_eq!(copy(r"a\b", 64, QuoteMode::Dequote), r"a\b");
    }

    #[test]
    fn clean_value_strips_unquoted_comments() {
        assert_eq!(clean("42 ; the answer"), ("42".to_string(), QuoteMode::None));
        assert_eq!(clean("42# note"), ("42".to_string(), QuoteMode::None));
    }

    #[test]
    fn clean_value_keeps_comment_markers_inside_quotes() {
        assert_eq!(clean(r#""a;b#c" ; real comment"#), ("a;b#c".to_string(), QuoteMode::Dequote));
        assert_eq!(clean(r#""say \"x;y\"" ;c"#), (r#"say \"x;y\""#.to_string(), QuoteMode::Dequote));
        assert_eq!(clean(r#""a""b;c""#), (r#"a""b;c"#.to_string(), QuoteMode::Dequote));
    }

    #[test]
    fn clean_value_handles_lone_quote() {
        assert_eq!(clean("\""), (String::new(), QuoteMode::Dequote));
    }

    #[test]
    fn check_enquote_flags_values_that_would_not_survive() {
        assert_eq!(check_enquote(b"plain value"), QuoteMode::None);
        assert_eq!(check_enquote(b"a;b"), QuoteMode::Enquote);
        assert_eq!(check_enquote(b"#hash"), QuoteMode::Enquote);
        assert_eq!(check_enquote(br#"q"q"#), QuoteMode::Enquote);
        assert_eq!(check_enquote(b"trailing "), QuoteMode::Enquote);
        assert_eq!(check_enquote(b" leading"), QuoteMode::Enquote);
        assert_eq!(check_enquote(b""), QuoteMode::None);
    }
}
