//! Exact order statistics and summary metrics.
//!
//! Everything in this module operates on exact (never sampled) data. The
//! primitives here (quantiles, the percentile ladder, N50) are shared with
//! the density and temporal engines, while [`summary`] assembles them into
//! per-view and per-group [`StatsRecord`](summary::StatsRecord)s.

pub mod groups;
pub mod summary;

use crate::errors::{Error, Result};

/// Seconds per hour, for converting start times to hours of run.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Number of entries in a percentile ladder (0th through 100th, step 1).
pub const LADDER_STEPS: usize = 101;

/// Drops missing values and sorts the rest in ascending order.
pub fn sorted_present(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.iter().copied().filter(|v| !v.is_nan()).collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Computes the `q`-th quantile (`0.0..=1.0`) of sorted data by linear
/// interpolation between the two closest ranks, or `None` for empty data.
///
/// The interpolation is arranged so that `q = 0` and `q = 1` return exactly the
/// first and last values.
///
/// ```
/// use lrqc::stats::quantile_sorted;
///
/// assert_eq!(quantile_sorted(&[1.0, 2.0, 4.0], 0.75), Some(3.0));
/// assert_eq!(quantile_sorted(&[], 0.5), None);
/// ```
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = q * last as f64;
    let lo = (position.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let t = position - lo as f64;

    let (a, b) = (sorted[lo], sorted[hi]);
    let delta = b - a;
    if t >= 0.5 {
        Some(b - delta * (1.0 - t))
    } else {
        Some(a + delta * t)
    }
}

/// Computes the requested percentiles (`0.0..=100.0`) of the non-missing
/// values.
///
/// ```
/// use lrqc::stats::percentiles;
///
/// let p = percentiles(&[1.0, 2.0, 3.0, 4.0, f64::NAN], &[0.0, 50.0, 100.0]).unwrap();
/// assert_eq!(p, [1.0, 2.5, 4.0]);
/// ```
pub fn percentiles(values: &[f64], percents: &[f64]) -> Result<Vec<f64>> {
    if let Some(p) = percents.iter().find(|p| !(0.0..=100.0).contains(*p)) {
        return Err(Error::invalid(format!(
            "percentiles must be between 0 and 100 (got {})",
            p
        )));
    }

    let sorted = sorted_present(values);
    if sorted.is_empty() {
        return Err(Error::insufficient("no values to compute percentiles from"));
    }

    percents
        .iter()
        .map(|p| quantile_sorted(&sorted, p / 100.0))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::insufficient("no values to compute percentiles from"))
}

/// Computes the 101-point percentile ladder (0th through 100th percentile) of
/// the non-missing values.
pub fn quantile_ladder(values: &[f64]) -> Result<Vec<f64>> {
    let percents = (0..LADDER_STEPS).map(|p| p as f64).collect::<Vec<_>>();
    percentiles(values, &percents)
}

/// Computes the median of the non-missing values.
pub fn median(values: &[f64]) -> Result<f64> {
    Ok(percentiles(values, &[50.0])?[0])
}

/// Computes the N50 of a set of read lengths: sorting the lengths in
/// ascending order and accumulating them, the N50 is the first length at
/// which the running sum reaches half of the total.
///
/// ```
/// use lrqc::stats::n50;
///
/// // Cumulative sums are [1, 3, 6, 10]; half of 10 is first reached at 3.
/// assert_eq!(n50(&[4, 2, 1, 3]).unwrap(), 3);
/// ```
pub fn n50(lengths: &[u64]) -> Result<u64> {
    if lengths.is_empty() {
        return Err(Error::insufficient("no lengths to compute an N50 from"));
    }

    let mut sorted = lengths.to_vec();
    sorted.sort_unstable();

    // `cumulative >= total / 2` without leaving integer arithmetic.
    let total: u128 = sorted.iter().map(|l| u128::from(*l)).sum();
    let mut cumulative: u128 = 0;
    for length in &sorted {
        cumulative += u128::from(*length);
        if 2 * cumulative >= total {
            return Ok(*length);
        }
    }

    // The loop always returns once the final length has been added.
    Ok(sorted[sorted.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n50_worked_example() {
        assert_eq!(n50(&[1, 2, 3, 4]).unwrap(), 3);
    }

    #[test]
    fn test_n50_is_order_invariant() {
        let lengths = [500, 20, 7_000, 1_200, 300, 9_000, 40];
        let mut reversed = lengths;
        reversed.reverse();
        assert_eq!(n50(&lengths).unwrap(), n50(&reversed).unwrap());
        assert_eq!(n50(&lengths).unwrap(), 7_000);
    }

    #[test]
    fn test_n50_degenerate_inputs() {
        assert_eq!(n50(&[]), Err(Error::insufficient("no lengths to compute an N50 from")));
        assert_eq!(n50(&[42]).unwrap(), 42);
        assert_eq!(n50(&[0, 0]).unwrap(), 0);
    }

    #[test]
    fn test_ladder_ends_are_min_and_max() {
        let values = [3.7, -1.25, 10.5, 8.0, 0.1, 2.2];
        let ladder = quantile_ladder(&values).unwrap();
        assert_eq!(ladder.len(), LADDER_STEPS);
        assert_eq!(ladder[0], -1.25);
        assert_eq!(ladder[100], 10.5);
        assert!(ladder.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_linear_interpolation() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentiles(&values, &[25.0]).unwrap(), [17.5]);
        assert!((percentiles(&values, &[90.0]).unwrap()[0] - 37.0).abs() < 1e-9);
        assert_eq!(median(&[5.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_quantile_of_empty_data_is_none() {
        assert_eq!(quantile_sorted(&[], 0.0), None);
        assert_eq!(quantile_sorted(&[], 1.0), None);
        assert_eq!(quantile_sorted(&[3.0], 0.5), Some(3.0));
        assert_eq!(quantile_sorted(&[1.0, 3.0], 1.0), Some(3.0));
    }

    #[test]
    fn test_missing_values_are_dropped() {
        assert_eq!(median(&[f64::NAN, 1.0, 3.0]).unwrap(), 2.0);
        assert!(matches!(median(&[f64::NAN]), Err(Error::InsufficientData(_))));
        assert!(matches!(
            percentiles(&[1.0], &[101.0]),
            Err(Error::InvalidParameter(_))
        ));
    }
}
