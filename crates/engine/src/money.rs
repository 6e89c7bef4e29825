use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (income amounts,
/// allocations, payments, attributions) to avoid floating-point drift.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input accepts `.` or `,` as decimal separator and rounds
/// half-up to two decimals:
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().cents(), 1050);
/// assert_eq!("123.456".parse::<Money>().unwrap().cents(), 12346);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Converts a decimal amount in major units (e.g. `123.456`) into cents,
    /// rounding half-up to two decimals.
    ///
    /// The conversion goes through the shortest decimal representation of
    /// the float, so `0.1 + 0.2` style artefacts never leak into the ledger.
    pub fn from_major(value: f64) -> ResultEngine<Money> {
        if !value.is_finite() {
            return Err(EngineError::InvalidAmount(
                "amount must be a finite number".to_string(),
            ));
        }
        value.to_string().parse()
    }

    /// Returns the amount in major units, for JSON output.
    #[must_use]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Applies a basis-point percentage (`10_000` = 100%), rounding half-up.
    #[must_use]
    pub fn percent_of(self, basis_points: i64) -> Money {
        Money(crate::distribute::round_half_up_div(
            i128::from(self.0) * i128::from(basis_points),
            10_000,
        ) as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// Digits past the second decimal are rounded half-up.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s)
            .map(Money)
            .map_err(|reason| EngineError::InvalidAmount(reason.to_string()))
    }
}

/// Parses a decimal string into an integer number of hundredths.
///
/// Shared by [`Money`] (cents) and [`crate::Percentage`] (basis points).
pub(crate) fn parse_hundredths(s: &str) -> Result<i64, &'static str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("empty amount");
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err("empty amount");
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let units_str = parts.next().ok_or("invalid amount")?;
    let frac_str = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return Err("invalid amount");
    }

    if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid amount");
    }
    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid amount");
    }

    let units: i64 = units_str.parse().map_err(|_| "amount too large")?;

    let digits: Vec<i64> = frac_str
        .bytes()
        .map(|b| i64::from(b - b'0'))
        .collect();
    let tenths = digits.first().copied().unwrap_or(0);
    let hundredths = digits.get(1).copied().unwrap_or(0);
    let round_up = digits.get(2).is_some_and(|d| *d >= 5);

    let total = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(tenths * 10 + hundredths))
        .and_then(|v| v.checked_add(i64::from(round_up)))
        .ok_or("amount too large")?;

    if negative {
        total.checked_neg().ok_or("amount too large")
    } else {
        Ok(total)
    }
}
