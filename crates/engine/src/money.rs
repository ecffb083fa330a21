use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};

use crate::Currency;

/// Money amount represented as **whole currency units** (pesos).
///
/// Invoice amounts never carry a fractional part, so a plain `i64` is enough
/// and avoids floating-point drift when summing totals.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(50_000);
/// assert_eq!(amount.to_string(), "$\u{a0}50.000");
/// assert_eq!(Money::parse_digits("$ 50.000"), Some(amount));
/// assert_eq!(Money::parse_digits("abc"), None);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from whole units.
    #[must_use]
    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    /// Returns the raw value in whole units.
    #[must_use]
    pub const fn units(self) -> i64 {
        self.0
    }

    /// Extracts every ASCII digit of `text` and reads them as one integer.
    ///
    /// Returns `None` when there is no digit at all (a field left empty) or
    /// when the digits do not fit an `i64`.
    #[must_use]
    pub fn parse_digits(text: &str) -> Option<Money> {
        let digits = only_digits(text);
        if digits.is_empty() {
            return None;
        }
        digits.parse::<i64>().ok().map(Money)
    }

    /// Formats the amount for display, e.g. `$ 50.000` (the space is a NBSP).
    #[must_use]
    pub fn format(self, currency: Currency) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let grouped = group_thousands(self.0.unsigned_abs(), currency.group_separator());
        format!("{sign}{}\u{a0}{grouped}", currency.symbol())
    }
}

/// Keeps only the ASCII digits of `text`.
#[must_use]
pub fn only_digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(Currency::default()))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}
