//! Gaussian smoothing of binned series and matrices.
//!
//! The kernel is a sampled Gaussian truncated at four standard deviations and
//! normalized to sum to one. Borders are handled by reflection about the edge
//! of the series (`d c b a | a b c d | d c b a`), so the total mass of a series
//! is preserved.
//!
//! Missing bins (NaN) stay missing: a NaN input produces a NaN output, and the
//! remaining outputs are weighted averages over their non-missing neighbours
//! only. A series without NaN is smoothed by plain convolution.

use crate::errors::{check_sigma, Result};

/// Number of standard deviations after which the kernel is truncated.
pub const TRUNCATE: f64 = 4.0;

/// The normalized kernel for a given sigma (`2 * radius + 1` weights).
pub fn kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let mut weights = (-radius..=radius)
        .map(|x| (-0.5 / (sigma * sigma) * (x * x) as f64).exp())
        .collect::<Vec<_>>();

    let total: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= total;
    }

    weights
}

// Maps an out-of-range index back into `0..n` by reflection.
fn reflect(i: i64, n: usize) -> usize {
    let n = n as i64;
    let m = i.rem_euclid(2 * n);
    match m < n {
        true => m as usize,
        false => (2 * n - 1 - m) as usize,
    }
}

/// Smooths a series with a Gaussian kernel of the given sigma. A sigma of
/// zero returns the series unchanged.
///
/// ```
/// use lrqc::utils::smoothing::gaussian_filter1d;
///
/// let smoothed = gaussian_filter1d(&[0.0, 0.0, 3.0, 0.0, 0.0], 1.0).unwrap();
/// assert!((smoothed.iter().sum::<f64>() - 3.0).abs() < 1e-9);
/// assert!(smoothed[2] < 3.0 && smoothed[1] > 0.0);
/// ```
pub fn gaussian_filter1d(input: &[f64], sigma: f64) -> Result<Vec<f64>> {
    check_sigma(sigma)?;

    if sigma == 0.0 || input.is_empty() {
        return Ok(input.to_vec());
    }

    let weights = kernel(sigma);
    let radius = (weights.len() / 2) as i64;
    let n = input.len();

    let output = (0..n)
        .map(|i| {
            if input[i].is_nan() {
                return f64::NAN;
            }

            let mut acc = 0.0;
            let mut present = 0.0;
            let mut missing = false;

            for (k, w) in weights.iter().enumerate() {
                let j = reflect(i as i64 + k as i64 - radius, n);
                let v = input[j];
                if v.is_nan() {
                    missing = true;
                } else {
                    acc += w * v;
                    present += w;
                }
            }

            match missing {
                true => acc / present,
                false => acc,
            }
        })
        .collect();

    Ok(output)
}

/// Smooths every column of a row-major matrix (i.e., along axis 0).
pub fn gaussian_filter_columns(matrix: &[Vec<f64>], sigma: f64) -> Result<Vec<Vec<f64>>> {
    check_sigma(sigma)?;

    let n_cols = matrix.first().map(Vec::len).unwrap_or_default();
    let mut output = matrix.to_vec();

    for col in 0..n_cols {
        let column = matrix.iter().map(|row| row[col]).collect::<Vec<_>>();
        for (row, value) in gaussian_filter1d(&column, sigma)?.into_iter().enumerate() {
            output[row][col] = value;
        }
    }

    Ok(output)
}

/// Smooths every row of a row-major matrix (i.e., along axis 1).
pub fn gaussian_filter_rows(matrix: &[Vec<f64>], sigma: f64) -> Result<Vec<Vec<f64>>> {
    matrix
        .iter()
        .map(|row| gaussian_filter1d(row, sigma))
        .collect()
}

/// Smooths a matrix along both axes with the same sigma.
pub fn gaussian_filter2d(matrix: &[Vec<f64>], sigma: f64) -> Result<Vec<Vec<f64>>> {
    let smoothed = gaussian_filter_columns(matrix, sigma)?;
    gaussian_filter_rows(&smoothed, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_kernel_is_normalized_and_truncated() {
        let k = kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!(close(k.iter().sum(), 1.0));
        assert!(close(k[0], k[8]));

        assert_eq!(kernel(2.0).len(), 17);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let input = [1.0, 5.0, 2.0];
        assert_eq!(gaussian_filter1d(&input, 0.0).unwrap(), input);
        assert!(gaussian_filter1d(&input, -1.0).is_err());
    }

    #[test]
    fn test_constant_series_is_unchanged() {
        let smoothed = gaussian_filter1d(&[2.0; 6], 1.5).unwrap();
        assert!(smoothed.iter().all(|v| close(*v, 2.0)));
    }

    #[test]
    fn test_mass_is_preserved() {
        let input = [0.0, 4.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let smoothed = gaussian_filter1d(&input, 1.0).unwrap();
        assert!(close(smoothed.iter().sum(), 5.0));
    }

    #[test]
    fn test_missing_bins_stay_missing() {
        let input = [1.0, f64::NAN, 1.0, 1.0];
        let smoothed = gaussian_filter1d(&input, 1.0).unwrap();
        assert!(smoothed[1].is_nan());
        for i in [0, 2, 3] {
            assert!(close(smoothed[i], 1.0));
        }
    }

    #[test]
    fn test_columns_only() {
        let matrix = vec![vec![0.0, 1.0], vec![3.0, 1.0], vec![0.0, 1.0]];
        let smoothed = gaussian_filter_columns(&matrix, 1.0).unwrap();
        assert!(close(smoothed.iter().map(|r| r[0]).sum(), 3.0));
        assert!(smoothed.iter().all(|r| close(r[1], 1.0)));
        assert!(smoothed[0][0] > 0.0);
    }

    #[test]
    fn test_two_dimensional_mass() {
        let mut matrix = vec![vec![0.0; 5]; 4];
        matrix[1][2] = 10.0;
        let smoothed = gaussian_filter2d(&matrix, 1.0).unwrap();
        let total: f64 = smoothed.iter().flatten().sum();
        assert!(close(total, 10.0));
    }
}
