//! Currency formatting and parsing in pt-BR notation.
//!
//! Amounts are shown as `R$ 1.234,56`: dot for thousands, comma for the
//! decimal separator, always two fraction digits. Parsing never fails: input
//! fields are re-parsed on every keystroke, so anything that does not read as
//! a number (empty field, stray letters, a dangling separator) becomes zero.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fraction digits of the currency.
pub const SCALE: u32 = 2;

const SYMBOL: &str = "R$";

/// Round an amount to the currency scale, half away from zero.
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount as `R$ 1.234,50` (negative: `-R$ 1.234,50`).
pub fn format(amount: Decimal) -> String {
    let rounded = round(amount);
    let mut magnitude = rounded.abs();
    magnitude.rescale(SCALE);

    let plain = magnitude.to_string();
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    format!("{sign}{SYMBOL} {},{fraction}", group_thousands(integer))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    grouped
}

/// Parse a pt-BR amount such as `1.234,56` or `R$ 1.234,56`.
///
/// Dots are thousands separators and are dropped, the first comma becomes the
/// decimal point, and every other character except digits is stripped. A
/// minus sign survives only ahead of the first digit. Returns zero for empty
/// or unparseable input.
pub fn parse(text: &str) -> Decimal {
    let normalized = text.replace('.', "").replacen(',', ".", 1);
    let mut cleaned = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        match c {
            '0'..='9' | '.' => cleaned.push(c),
            '-' if cleaned.is_empty() => cleaned.push(c),
            _ => {}
        }
    }

    // "12," is a normal intermediate state while typing.
    if cleaned.ends_with('.') {
        cleaned.pop();
    }
    if cleaned.starts_with('.') {
        cleaned.insert(0, '0');
    } else if cleaned.starts_with("-.") {
        cleaned.insert(1, '0');
    }

    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

/// Parse a masked amount field, where every typed digit shifts in from the
/// right as cents: `"R$ 12,34"` and `"1234"` both read as `12.34`.
pub fn parse_masked(text: &str) -> Decimal {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();

    Decimal::from_str(&digits)
        .map(|cents| cents / Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}
