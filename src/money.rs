//! Monetary value normalisation.
//!
//! Amounts are typed by people as decimal text with either `,` or `.` as
//! separator and stored as an exact count of cents in a 32-bit integer
//! column. Over-precise input is truncated to two fractional digits, both
//! while typing and when the value is parsed.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Number of minor units in one display unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Largest number of fractional digits an amount may carry.
pub const MAX_DECIMAL_PLACES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Please enter an invoice value")]
    EmptyInput,
    #[error("Please enter a valid number")]
    NotANumber,
    #[error("Value must be a positive number")]
    NonPositiveValue,
    #[error("Value can have a maximum of 2 decimal places")]
    TooManyDecimalPlaces,
    #[error("Value is too large")]
    ValueOutOfRange,
}

/// A positive amount held as an exact number of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(i32);

impl Money {
    /// Validate a minor-unit amount coming from storage or a typed caller.
    pub fn from_cents(cents: i64) -> Result<Self, MoneyError> {
        if cents <= 0 {
            return Err(MoneyError::NonPositiveValue);
        }
        let cents = i32::try_from(cents).map_err(|_| MoneyError::ValueOutOfRange)?;
        if !round_trips(cents) {
            return Err(MoneyError::TooManyDecimalPlaces);
        }
        Ok(Self(cents))
    }

    pub fn cents(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(i64::from(self.0)))
    }
}

/// `true` when dividing by 100 and scaling back reproduces `cents` exactly.
pub fn round_trips(cents: i32) -> bool {
    let amount = f64::from(cents) / CENTS_PER_UNIT as f64;
    (amount * CENTS_PER_UNIT as f64).round() as i64 == i64::from(cents)
}

/// Filter raw keystrokes the way the value input does while typing.
///
/// Only digits and separators survive. The integer part is followed by the
/// first non-empty fractional segment, cut to two digits; anything after a
/// second separator is dropped. The separator in the output is always `,`.
pub fn sanitize_amount_input(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || is_separator(*c))
        .collect();

    let Some(first_separator) = filtered.find(is_separator) else {
        return filtered;
    };

    let integer = &filtered[..first_separator];
    let fraction = filtered[first_separator + 1..]
        .split(is_separator)
        .find(|segment| !segment.is_empty());

    match fraction {
        Some(fraction) => {
            let kept: String = fraction.chars().take(MAX_DECIMAL_PLACES).collect();
            format!("{integer},{kept}")
        }
        // Trailing separator stays so the user can keep typing.
        None => format!("{integer},"),
    }
}

/// Parse user-entered text into a positive amount of cents.
pub fn parse_amount(raw: &str) -> Result<Money, MoneyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MoneyError::NonPositiveValue);
    }

    // A minus anywhere before the first digit, so "$-5" is negative too.
    let negative = trimmed
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .any(|c| c == '-');
    let sanitized = sanitize_amount_input(trimmed);
    if !sanitized.chars().any(|c| c.is_ascii_digit()) {
        return Err(MoneyError::NotANumber);
    }

    let mut normalized = sanitized.replacen(',', ".", 1);
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }
    let parsed: f64 = normalized.parse().map_err(|_| MoneyError::NotANumber)?;
    let value = if negative { -parsed } else { parsed };

    normalize_amount(value)
}

/// Round a display-unit amount to cents, rejecting values that cannot be stored.
pub fn normalize_amount(value: f64) -> Result<Money, MoneyError> {
    if value.is_nan() {
        return Err(MoneyError::NotANumber);
    }
    if value <= 0.0 {
        return Err(MoneyError::NonPositiveValue);
    }
    if !value.is_finite() {
        return Err(MoneyError::ValueOutOfRange);
    }

    // f64::round rounds half away from zero.
    let rounded = (value * CENTS_PER_UNIT as f64).round() / CENTS_PER_UNIT as f64;
    if decimal_places(rounded) > MAX_DECIMAL_PLACES {
        return Err(MoneyError::TooManyDecimalPlaces);
    }
    if rounded <= 0.0 {
        return Err(MoneyError::NonPositiveValue);
    }

    let cents = (rounded * CENTS_PER_UNIT as f64).round();
    if cents > f64::from(i32::MAX) {
        return Err(MoneyError::ValueOutOfRange);
    }

    Money::from_cents(cents as i64)
}

/// Format cents as `12,64`.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{sign}{},{:02}",
        cents / CENTS_PER_UNIT as u64,
        cents % CENTS_PER_UNIT as u64
    )
}

/// Format cents as `$12,64`, the way listings and detail views show values.
pub fn format_currency(cents: i64) -> String {
    format!("${}", format_amount(cents))
}

fn is_separator(c: char) -> bool {
    c == ',' || c == '.'
}

fn decimal_places(value: f64) -> usize {
    let text = value.to_string();
    text.split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("12,64", 1264)]
    #[case("12.64", 1264)]
    #[case("12", 1200)]
    #[case("12,", 1200)]
    #[case("0,5", 50)]
    #[case(",5", 50)]
    #[case("12,649", 1264)]
    #[case("1.234,56", 123)]
    #[case("$ 1 000,10", 100010)]
    #[case("  7.05 ", 705)]
    fn parses_to_cents(#[case] input: &str, #[case] cents: i32) {
        assert_eq!(parse_amount(input).map(Money::cents), Ok(cents));
    }

    #[rstest]
    #[case("0", MoneyError::NonPositiveValue)]
    #[case("0,00", MoneyError::NonPositiveValue)]
    #[case("0,001", MoneyError::NonPositiveValue)]
    #[case("-5", MoneyError::NonPositiveValue)]
    #[case("$-5", MoneyError::NonPositiveValue)]
    #[case("R$ -12,50", MoneyError::NonPositiveValue)]
    #[case("", MoneyError::NonPositiveValue)]
    #[case("   ", MoneyError::NonPositiveValue)]
    #[case("abc", MoneyError::NotANumber)]
    #[case(",", MoneyError::NotANumber)]
    #[case("99999999999", MoneyError::ValueOutOfRange)]
    fn rejects_invalid_amounts(#[case] input: &str, #[case] error: MoneyError) {
        assert_eq!(parse_amount(input), Err(error));
    }

    #[rstest]
    #[case("12.649", "12,64")]
    #[case("12,6", "12,6")]
    #[case("1a2b,3c", "12,3")]
    #[case("1,,5", "1,5")]
    #[case("1.2.3", "1,2")]
    #[case("12.", "12,")]
    #[case("", "")]
    fn sanitizes_like_the_value_input(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_amount_input(raw), expected);
    }

    #[test]
    fn over_precision_is_truncated_not_rounded() {
        assert_eq!(parse_amount("12,649").map(Money::cents), Ok(1264));
        assert_eq!(parse_amount("0,019").map(Money::cents), Ok(1));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(normalize_amount(0.125).map(Money::cents), Ok(13));
        assert_eq!(normalize_amount(2.5).map(Money::cents), Ok(250));
    }

    #[test]
    fn from_cents_rejects_non_positive_and_oversized() {
        assert_eq!(Money::from_cents(0), Err(MoneyError::NonPositiveValue));
        assert_eq!(Money::from_cents(-1), Err(MoneyError::NonPositiveValue));
        assert_eq!(
            Money::from_cents(i64::from(i32::MAX) + 1),
            Err(MoneyError::ValueOutOfRange)
        );
        assert_eq!(Money::from_cents(1264).map(Money::cents), Ok(1264));
    }

    #[test]
    fn formats_with_comma_separator() {
        assert_eq!(format_currency(1264), "$12,64");
        assert_eq!(format_currency(5), "$0,05");
        assert_eq!(format_currency(0), "$0,00");
        assert_eq!(format_currency(-150), "$-1,50");
        assert_eq!(Money::from_cents(100010).unwrap().to_string(), "1000,10");
    }

    proptest! {
        #[test]
        fn separator_choice_does_not_change_the_result(units in 0u32..1_000_000, cents in 0u32..100) {
            let comma = parse_amount(&format!("{units},{cents:02}"));
            let dot = parse_amount(&format!("{units}.{cents:02}"));
            prop_assert_eq!(comma, dot);
        }

        #[test]
        fn valid_amounts_map_to_exact_cents(units in 0u32..1_000_000, cents in 1u32..100) {
            let money = parse_amount(&format!("{units}.{cents:02}")).unwrap();
            prop_assert_eq!(i64::from(money.cents()), i64::from(units) * 100 + i64::from(cents));
        }

        #[test]
        fn parsed_cents_round_trip(units in 0u32..10_000_000, cents in 1u32..100) {
            let money = parse_amount(&format!("{units},{cents:02}")).unwrap();
            let m = money.cents();
            prop_assert_eq!((f64::from(m) / 100.0 * 100.0).round() as i32, m);
            prop_assert!(round_trips(m));
        }

        #[test]
        fn extra_digits_are_truncated(units in 1u32..100_000, cents in 0u32..100, extra in 0u32..10) {
            let truncated = parse_amount(&format!("{units},{cents:02}{extra}"));
            let exact = parse_amount(&format!("{units},{cents:02}"));
            prop_assert_eq!(truncated, exact);
        }
    }
}
