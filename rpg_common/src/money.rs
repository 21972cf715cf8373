use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

//--------------------------------------     MinorUnits      ---------------------------------------------------------
/// A monetary amount in integer minor currency units (cents, øre, etc.).
///
/// All settlement arithmetic happens in this type. Conversion to and from decimal display values only happens at I/O
/// boundaries ([`MinorUnits::from_major`], [`Display`], [`FromStr`]), so rounding drift cannot accumulate inside the
/// engine.
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, AddAssign, add_assign via Add, add);
op!(inplace MinorUnits, SubAssign, sub_assign via Sub, sub);
op!(unary MinorUnits, Neg, neg);

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MinorUnits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MinorUnits {}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid monetary amount: {0}")]
pub struct AmountParseError(String);

impl FromStr for MinorUnits {
    type Err = AmountParseError;

    /// Parses a free-text decimal amount, e.g. `"19.99"`, `"1,234.56"` or `"1 234.56"`.
    ///
    /// Thousands separators (commas, apostrophes and spaces before the decimal point) are stripped. A trailing
    /// comma-group is treated as the decimal separator when no point is present, so `"19,99"` parses as 1999.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountParseError("empty string".to_string()));
        }
        let (sign, trimmed) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed),
        };
        // Prefer '.' as the decimal separator. A single final ",dd" group is a decimal comma.
        let normalised = if !trimmed.contains('.') && matches!(trimmed.rsplit_once(','), Some((_, d)) if d.len() == 2) {
            let (whole, decimals) = trimmed.rsplit_once(',').unwrap_or_default();
            format!("{whole}.{decimals}")
        } else {
            trimmed.to_string()
        };
        let cleaned: String = normalised.chars().filter(|c| !matches!(c, ',' | '\'' | ' ' | '\u{a0}')).collect();
        let mut parts = cleaned.splitn(2, '.');
        let whole = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AmountParseError(s.to_string()))?
            .parse::<i64>()
            .map_err(|e| AmountParseError(format!("{s}: {e}")))?;
        let cents = match parts.next() {
            None => 0,
            Some(d) if d.is_empty() => 0,
            Some(d) => {
                // Only the first two decimal digits carry value. Collect by char so multibyte input fails the
                // parse below instead of hitting a byte-boundary slice.
                let leading: String = d.chars().take(2).collect();
                let padded = format!("{leading:0<2}");
                padded.parse::<i64>().map_err(|e| AmountParseError(format!("{s}: {e}")))?
            },
        };
        let total = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .ok_or_else(|| AmountParseError(format!("{s}: amount out of range")))?;
        Ok(Self(sign * total))
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Converts a decimal major-unit amount into minor units, rounding to the nearest cent.
    pub fn from_major(amount: f64) -> Self {
        Self((amount * 100.0).round() as i64)
    }
}
