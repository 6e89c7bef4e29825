use std::{fmt, iter::Sum, ops::Add, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine, distribute::round_half_up_div, money};

/// A percentage stored as **basis points** (1/100 of a percent).
///
/// `Percentage::HUNDRED` is `10_000`. Decimal input is rounded half-up to two
/// decimals of a percent, the same policy [`Money`] uses for cents.
///
/// ```rust
/// use engine::Percentage;
///
/// let p: Percentage = "33.333".parse().unwrap();
/// assert_eq!(p.basis_points(), 3_333);
/// assert_eq!(p.to_string(), "33.33%");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Percentage(i64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const HUNDRED: Percentage = Percentage(10_000);
    /// Accepted distance from 100% when checking that a set sums to 100.
    pub const SUM_TOLERANCE: i64 = 1;

    #[must_use]
    pub const fn from_basis_points(bp: i64) -> Self {
        Self(bp)
    }

    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }

    /// Converts a decimal percentage (e.g. `12.5`) into basis points.
    pub fn from_percent(value: f64) -> ResultEngine<Percentage> {
        if !value.is_finite() {
            return Err(EngineError::InvalidPercentage(
                "percentage must be a finite number".to_string(),
            ));
        }
        value.to_string().parse()
    }

    #[must_use]
    pub fn to_percent(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `true` when the value lies in `[0, 100]`.
    #[must_use]
    pub const fn is_within_range(self) -> bool {
        self.0 >= 0 && self.0 <= Self::HUNDRED.0
    }

    /// `true` when the value is 100% within [`Self::SUM_TOLERANCE`].
    #[must_use]
    pub const fn is_whole(self) -> bool {
        (self.0 - Self::HUNDRED.0).abs() <= Self::SUM_TOLERANCE
    }

    /// Share of `total` that `part` represents, rounded half-up.
    ///
    /// Returns zero when `total` is not positive.
    #[must_use]
    pub fn of_total(part: Money, total: Money) -> Percentage {
        if !total.is_positive() {
            return Percentage::ZERO;
        }
        Percentage(round_half_up_div(
            i128::from(part.cents()) * i128::from(Self::HUNDRED.0),
            i128::from(total.cents()),
        ) as i64)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}%", abs / 100, abs % 100)
    }
}

impl Add for Percentage {
    type Output = Percentage;

    fn add(self, rhs: Percentage) -> Self::Output {
        Percentage(self.0 + rhs.0)
    }
}

impl Sum for Percentage {
    fn sum<I: Iterator<Item = Percentage>>(iter: I) -> Self {
        iter.fold(Percentage::ZERO, |acc, p| acc + p)
    }
}

impl FromStr for Percentage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
        money::parse_hundredths(trimmed)
            .map(Percentage)
            .map_err(|reason| {
                EngineError::InvalidPercentage(reason.replace("amount", "percentage"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_rounds() {
        assert_eq!("50".parse::<Percentage>().unwrap().basis_points(), 5_000);
        assert_eq!("12.5%".parse::<Percentage>().unwrap().basis_points(), 1_250);
        assert_eq!("0.005".parse::<Percentage>().unwrap().basis_points(), 1);
        assert!("fifty".parse::<Percentage>().is_err());
    }

    #[test]
    fn range_and_whole_checks() {
        assert!(Percentage::HUNDRED.is_within_range());
        assert!(!Percentage::from_percent(101.0).unwrap().is_within_range());
        assert!(!Percentage::from_basis_points(-1).is_within_range());
        assert!(Percentage::from_basis_points(9_999).is_whole());
        assert!(Percentage::from_basis_points(10_001).is_whole());
        assert!(!Percentage::from_basis_points(9_998).is_whole());
    }

    #[test]
    fn of_total_derives_share() {
        let p = Percentage::of_total(Money::new(80_000), Money::new(400_000));
        assert_eq!(p.basis_points(), 2_000);
        assert_eq!(Percentage::of_total(Money::new(5), Money::ZERO), Percentage::ZERO);
    }
}
