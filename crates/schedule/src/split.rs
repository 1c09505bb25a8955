//! Volume Splitting
//!
//! Exact decimal arithmetic for dividing a quantity into near-equal,
//! tick-sized parts. All accounting is done in whole ticks so no
//! fractional-tick remainder can leak.

use rust_decimal::Decimal;

use crate::error::{Result, ScheduleError};

/// Split `quantity` into `n_parts` near-equal non-negative multiples of
/// `tick`.
///
/// The quantity is first floored to whole ticks; the remainder ticks of the
/// division are then handed out one each starting from the first part, so
/// early parts are larger by at most one tick. The result is deterministic
/// and sums exactly to the floored quantity.
pub fn split_even(quantity: Decimal, n_parts: usize, tick: Decimal) -> Result<Vec<Decimal>> {
    if n_parts == 0 {
        return Err(ScheduleError::EmptySplit);
    }
    if tick <= Decimal::ZERO {
        return Err(ScheduleError::InvalidTick(tick));
    }
    if quantity < Decimal::ZERO {
        return Err(ScheduleError::NegativeQuantity(quantity));
    }

    let total_ticks = (quantity / tick).floor();
    let n = Decimal::from(n_parts as u64);
    let base_ticks = (total_ticks / n).floor();
    let extra_ticks = total_ticks - base_ticks * n;

    let base = base_ticks * tick;
    let parts = (0..n_parts)
        .map(|i| {
            if Decimal::from(i as u64) < extra_ticks {
                base + tick
            } else {
                base
            }
        })
        .collect();
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_remainder_goes_to_first_parts() {
        let parts = split_even(dec!(1000), 3, dec!(1)).unwrap();
        assert_eq!(parts, vec![dec!(334), dec!(333), dec!(333)]);
    }

    #[test]
    fn test_fractional_tick() {
        let parts = split_even(dec!(1), 3, dec!(0.1)).unwrap();
        // 10 ticks across 3 parts: 4, 3, 3
        assert_eq!(parts, vec![dec!(0.4), dec!(0.3), dec!(0.3)]);
        let sum: Decimal = parts.iter().sum();
        assert_eq!(sum, dec!(1));
    }

    #[test]
    fn test_sub_tick_remainder_dropped() {
        // 10.07 at tick 0.1 floors to 100 ticks
        let parts = split_even(dec!(10.07), 4, dec!(0.1)).unwrap();
        let sum: Decimal = parts.iter().sum();
        assert_eq!(sum, dec!(10.0));
    }

    #[test]
    fn test_each_part_within_one_tick_of_even() {
        let tick = dec!(0.01);
        let parts = split_even(dec!(123.45), 7, tick).unwrap();
        let max = parts.iter().max().unwrap();
        let min = parts.iter().min().unwrap();
        assert!(max - min <= tick);
        let sum: Decimal = parts.iter().sum();
        assert_eq!(sum, dec!(123.45));
    }

    #[test]
    fn test_more_parts_than_ticks() {
        let parts = split_even(dec!(2), 5, dec!(1)).unwrap();
        assert_eq!(parts, vec![dec!(1), dec!(1), dec!(0), dec!(0), dec!(0)]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            split_even(dec!(1), 0, dec!(1)),
            Err(ScheduleError::EmptySplit)
        ));
        assert!(matches!(
            split_even(dec!(1), 2, dec!(0)),
            Err(ScheduleError::InvalidTick(_))
        ));
        assert!(matches!(
            split_even(dec!(-1), 2, dec!(1)),
            Err(ScheduleError::NegativeQuantity(_))
        ));
    }
}
