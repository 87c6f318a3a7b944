//! Fixed-precision monetary value: integer minor units (cents), display scale 2.
//!
//! Never a floating value. Money carries **no business policy** — whether a
//! balance may go negative is decided by the transaction processor, not here.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Minor units per major unit (cents per whole).
const MINOR_PER_MAJOR: i64 = 100;

/// A monetary amount in minor units (cents).
///
/// Arithmetic is exact and checked; no rounding ever occurs. Amounts used in
/// credit/debit operations must be strictly positive and balances must stay
/// non-negative, but both rules are enforced by the caller — `Money` itself
/// can represent any signed value so intermediate math stays honest.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Construct from minor units (e.g. `from_minor(50_000)` is 500.00).
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Construct from whole major units; `None` on overflow.
    pub fn from_major(major: i64) -> Option<Self> {
        major.checked_mul(MINOR_PER_MAJOR).map(Self)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Exact addition; `None` on overflow.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Exact subtraction; `None` on overflow. The result may be negative —
    /// rejecting a negative balance is the processor's job.
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    /// Two-decimal rendering, e.g. `500.00`, `-0.05`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:02}",
            abs / MINOR_PER_MAJOR as u64,
            abs % MINOR_PER_MAJOR as u64
        )
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    /// Parse a decimal string with at most two fractional digits
    /// (`"500"`, `"500.5"`, `"500.00"`, `"-0.05"`).
    ///
    /// This is the single point where decimal wire values become minor units;
    /// everything past this boundary is integer arithmetic.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || LedgerError::invalid_amount(format!("malformed decimal amount: {s:?}"));

        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, frac) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(malformed());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if frac.len() > 2 {
            return Err(LedgerError::invalid_amount(format!(
                "amount {s:?} has more than 2 fractional digits"
            )));
        }

        let whole_minor = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<i64>()
                .ok()
                .and_then(|w| w.checked_mul(MINOR_PER_MAJOR))
                .ok_or_else(malformed)?
        };
        let frac_minor = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| malformed())? * 10,
            _ => frac.parse::<i64>().map_err(|_| malformed())?,
        };

        let minor = whole_minor.checked_add(frac_minor).ok_or_else(malformed)?;
        Ok(Money(if negative { -minor } else { minor }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(Money::from_minor(50_000).to_string(), "500.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-5).to_string(), "-0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("500.00".parse::<Money>().unwrap(), Money::from_minor(50_000));
        assert_eq!("500.5".parse::<Money>().unwrap(), Money::from_minor(50_050));
        assert_eq!("500".parse::<Money>().unwrap(), Money::from_minor(50_000));
        assert_eq!(".50".parse::<Money>().unwrap(), Money::from_minor(50));
        assert_eq!("-5".parse::<Money>().unwrap(), Money::from_minor(-500));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", ".", "abc", "1.2.3", "0.005", "1,50", "--1"] {
            assert!(
                matches!(bad.parse::<Money>(), Err(LedgerError::InvalidAmount(_))),
                "expected InvalidAmount for {bad:?}"
            );
        }
    }

    #[test]
    fn from_major_scales_to_minor_units() {
        assert_eq!(Money::from_major(500), Some(Money::from_minor(50_000)));
        assert_eq!(Money::from_major(i64::MAX), None);
    }

    #[test]
    fn checked_arithmetic_is_exact() {
        let a = Money::from_minor(10_010);
        let b = Money::from_minor(15_000);
        assert_eq!(a.checked_add(b), Some(Money::from_minor(25_010)));
        assert_eq!(a.checked_sub(b), Some(Money::from_minor(-4_990)));
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::from_minor(1).is_positive());
        assert!(!Money::ZERO.is_positive());
        assert!(Money::from_minor(-1).is_negative());
    }

    proptest! {
        /// Formatting then re-parsing any amount is lossless.
        #[test]
        fn format_parse_round_trip(minor in -1_000_000_000i64..1_000_000_000i64) {
            let money = Money::from_minor(minor);
            let parsed: Money = money.to_string().parse().unwrap();
            prop_assert_eq!(parsed, money);
        }
    }
}
