//! Number formatting used in tables and chart labels.
//!
//! Figures follow the Argentine convention: `.` groups thousands and `,`
//! separates decimals, so `1234.5` renders as `1.234,50` with two decimals.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const THOUSANDS_SEPARATOR: char = '.';
const DECIMAL_SEPARATOR: char = ',';
const PERCENT_DECIMALS: u32 = 3;

/// Formats `value` with grouped thousands and `decimals` fractional digits.
///
/// Midpoints round away from zero.
pub fn grouped(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.*}", decimals as usize, rounded.abs());

    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + integer.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(digit);
    }
    if let Some(fraction) = fraction {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(fraction);
    }
    out
}

/// Same as [`grouped`] for floating point values; non-finite values yield an
/// empty string.
pub fn grouped_f64(value: f64, decimals: u32) -> String {
    Decimal::from_f64(value)
        .map(|value| grouped(value, decimals))
        .unwrap_or_default()
}

/// Formats a ratio as a percentage with three decimals, e.g. `0.01234` as
/// `1.234%`.
pub fn percent(ratio: Decimal) -> String {
    let scaled = (ratio * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(PERCENT_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}%", PERCENT_DECIMALS as usize, scaled)
}

/// Formats an optional ratio, leaving missing values blank.
pub fn percent_or_blank(ratio: Option<Decimal>) -> String {
    ratio.map(percent).unwrap_or_default()
}

/// Divides `value` by `scale` for display in millions, trillions, etc.
pub fn scaled(value: Decimal, scale: i64) -> Decimal {
    value / Decimal::from(scale)
}
