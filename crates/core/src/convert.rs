//! Conversions between stored text and numbers or booleans.
//!
//! Parsing is lenient: leading blanks are skipped, the longest valid prefix
//! is used, and text without one reads as zero. Integers saturate at the
//! bounds of their type instead of failing.

use crate::text::skip_leading;

struct Digits {
    negative: bool,
    magnitude: u64,
    overflowed: bool,
}

/// Base 16 when the second character is `x` or `X` (as in `0x1F`), else base 10.
fn radix_of(text: &[u8]) -> u32 {
    if matches!(text.get(1), Some(b'x' | b'X')) { 16 } else { 10 }
}

fn scan_digits(text: &[u8]) -> Digits {
    let radix = radix_of(text);
    let s = skip_leading(text);
    let (negative, s) = match s.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, s),
    };
    let s = match s {
        [b'0', b'x' | b'X', rest @ ..] if radix == 16 => rest,
        _ => s,
    };

    let mut digits = Digits { negative, magnitude: 0, overflowed: false };
    for &b in s {
        let Some(d) = char::from(b).to_digit(radix) else {
            break;
        };
        match digits.magnitude.checked_mul(u64::from(radix)).and_then(|m| m.checked_add(u64::from(d))) {
            Some(next) => digits.magnitude = next,
            None => {
                digits.magnitude = u64::MAX;
                digits.overflowed = true;
            }
        }
    }
    digits
}

#[must_use]
pub fn parse_i64(text: &[u8]) -> i64 {
    let Digits { negative, magnitude, .. } = scan_digits(text);
    if negative {
        0i64.checked_sub_unsigned(magnitude).unwrap_or(i64::MIN)
    } else {
        i64::try_from(magnitude).unwrap_or(i64::MAX)
    }
}

/// Like [`parse_i64`], but a leading `-` negates modulo 2^64.
#[must_use]
pub fn parse_u64(text: &[u8]) -> u64 {
    let Digits { negative, magnitude, overflowed } = scan_digits(text);
    match (overflowed, negative) {
        (true, _) => u64::MAX,
        (false, true) => magnitude.wrapping_neg(),
        (false, false) => magnitude,
    }
}

/// Longest decimal floating-point prefix, `0.0` when there is none.
#[must_use]
pub fn parse_f64(text: &[u8]) -> f64 {
    let s = skip_leading(text);
    let digits_from = |at: usize| s[at.min(s.len())..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = usize::from(matches!(s.first(), Some(b'-' | b'+')));
    let whole = digits_from(end);
    end += whole;
    let mut fraction = 0;
    if s.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        end += 1 + fraction;
    }
    if whole + fraction == 0 {
        return 0.0;
    }
    if matches!(s.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(s.get(end + 1), Some(b'-' | b'+')));
        let exponent = digits_from(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }

    std::str::from_utf8(&s[..end]).ok().and_then(|t| t.parse().ok()).unwrap_or(0.0)
}

/// `y`, `t` or `1` reads as true and `n`, `f` or `0` as false, judged by the
/// first character only. Anything else is not a boolean.
#[must_use]
pub fn parse_bool(text: &[u8]) -> Option<bool> {
    match text.first().map(u8::to_ascii_lowercase) {
        Some(b'y' | b't' | b'1') => Some(true),
        Some(b'n' | b'f' | b'0') => Some(false),
        _ => None,
    }
}

#[must_use]
pub fn format_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[must_use]
pub fn format_f64(value: f64) -> String {
    format!("{value}")
}
