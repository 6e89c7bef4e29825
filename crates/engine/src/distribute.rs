//! Deterministic splitting of an amount across weighted buckets.
//!
//! Every bucket but the last receives `round_half_up(total * weight / scale)`;
//! the last bucket absorbs whatever is left so the shares always add up to
//! `total` exactly.

use crate::Money;

/// Integer division rounding half away from zero.
///
/// `den` must be positive.
pub(crate) fn round_half_up_div(num: i128, den: i128) -> i128 {
    debug_assert!(den > 0);
    if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((2 * -num + den) / (2 * den))
    }
}

/// Splits `total` across `weights` relative to `scale`.
///
/// The allocation engine passes basis points with `scale = 10_000`; the
/// proportional attribution strategy passes remaining amounts with
/// `scale = sum(weights)`. The returned vector has the same length as
/// `weights` and always sums to `total`. A non-positive `scale` puts the
/// whole amount on the last bucket.
///
/// ```rust
/// use engine::{Money, distribute_with_remainder};
///
/// let shares = distribute_with_remainder(Money::new(100), &[1, 1, 1], 3);
/// assert_eq!(shares, vec![Money::new(33), Money::new(33), Money::new(34)]);
/// ```
#[must_use]
pub fn distribute_with_remainder(total: Money, weights: &[i64], scale: i64) -> Vec<Money> {
    let Some((_, head)) = weights.split_last() else {
        return Vec::new();
    };

    let mut shares: Vec<Money> = Vec::with_capacity(weights.len());
    let mut assigned = Money::ZERO;
    for weight in head {
        let share = if scale > 0 {
            Money::new(round_half_up_div(
                i128::from(total.cents()) * i128::from(*weight),
                i128::from(scale),
            ) as i64)
        } else {
            Money::ZERO
        };
        assigned += share;
        shares.push(share);
    }
    shares.push(total - assigned);
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(values: &[i64]) -> Vec<Money> {
        values.iter().copied().map(Money::new).collect()
    }

    #[test]
    fn residual_goes_to_last_bucket() {
        let shares = distribute_with_remainder(Money::new(1000), &[3_333, 3_333, 3_334], 10_000);
        assert_eq!(shares, cents(&[333, 333, 334]));

        let shares = distribute_with_remainder(Money::new(1), &[5_000, 5_000], 10_000);
        assert_eq!(shares, cents(&[1, 0]));
    }

    #[test]
    fn proportional_split_matches_weights() {
        let shares = distribute_with_remainder(Money::new(12_550), &[300_000, 200_000], 500_000);
        assert_eq!(shares, cents(&[7_530, 5_020]));
    }

    #[test]
    fn shares_always_sum_to_total() {
        for total in [0, 1, 99, 100, 12_345, 400_000] {
            for weights in [&[1, 2, 3][..], &[7][..], &[1_000, 1, 1, 1][..]] {
                let scale: i64 = weights.iter().sum();
                let shares = distribute_with_remainder(Money::new(total), weights, scale);
                assert_eq!(shares.len(), weights.len());
                assert_eq!(shares.iter().copied().sum::<Money>(), Money::new(total));
            }
        }
    }

    #[test]
    fn empty_and_degenerate_inputs() {
        assert!(distribute_with_remainder(Money::new(10), &[], 10).is_empty());
        assert_eq!(
            distribute_with_remainder(Money::new(10), &[0, 0], 0),
            cents(&[0, 10])
        );
    }

    #[test]
    fn half_up_division() {
        assert_eq!(round_half_up_div(5, 10), 1);
        assert_eq!(round_half_up_div(4, 10), 0);
        assert_eq!(round_half_up_div(15, 10), 2);
        assert_eq!(round_half_up_div(-15, 10), -2);
    }
}
