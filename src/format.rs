//! Money display and lenient money input parsing.

use crate::allowance::round_currency;

/// Currency symbols and separators stripped from money input before
/// parsing.
const MONEY_NOISE: [char; 4] = ['₫', '$', '€', ','];

/// Formats an amount as a whole number of currency units with `.` as the
/// thousands separator (`1234567.4` renders as `1.234.567`).
///
/// Non-finite amounts render as `0`.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "`as` saturates and budget amounts are far below i64::MAX"
    )]
    let whole = round_currency(amount) as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut formatted = String::with_capacity(digits.len().saturating_mul(2));
    if whole < 0 {
        formatted.push('-');
    }
    let len = digits.len();
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && len.saturating_sub(position).rem_euclid(3) == 0 {
            formatted.push('.');
        }
        formatted.push(digit);
    }
    formatted
}

/// Formats an amount followed by a currency symbol, e.g. `50.000 ₫`.
#[must_use]
pub fn format_money(amount: f64, symbol: &str) -> String {
    let number = format_currency(amount);
    if symbol.is_empty() {
        number
    } else {
        format!("{number} {symbol}")
    }
}

/// Parses user-typed money text, returning `0.0` when nothing numeric can
/// be read.
///
/// Currency symbols (`₫ $ €`), commas and whitespace are removed first;
/// the longest leading run shaped like a decimal number is then parsed, so
/// `"12abc"` reads as `12`. A run that overflows to infinity reads as `0`.
#[must_use]
pub fn parse_money_value(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|ch| !ch.is_whitespace() && !MONEY_NOISE.contains(ch))
        .collect();
    cleaned
        .get(..numeric_prefix_len(&cleaned))
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Byte length of the longest prefix of `text` shaped like a decimal
/// number: an optional sign, digits with at most one `.`, then an optional
/// exponent. Zero when the mantissa has no digit.
fn numeric_prefix_len(text: &str) -> usize {
    let is_sign = |byte: &u8| matches!(*byte, b'+' | b'-');
    let mut bytes = text.bytes().peekable();
    let mut len = usize::from(bytes.next_if(is_sign).is_some());

    let mut digits = 0_usize;
    let mut seen_dot = false;
    while let Some(byte) =
        bytes.next_if(|byte| byte.is_ascii_digit() || (*byte == b'.' && !seen_dot))
    {
        if byte == b'.' {
            seen_dot = true;
        } else {
            digits = digits.saturating_add(1);
        }
        len = len.saturating_add(1);
    }
    if digits == 0 {
        return 0;
    }

    if bytes.next_if(|byte| matches!(*byte, b'e' | b'E')).is_some() {
        let exponent_sign = usize::from(bytes.next_if(is_sign).is_some());
        let exponent_digits = bytes.take_while(u8::is_ascii_digit).count();
        if exponent_digits > 0 {
            len = len
                .saturating_add(1)
                .saturating_add(exponent_sign)
                .saturating_add(exponent_digits);
        }
    }
    len
}
