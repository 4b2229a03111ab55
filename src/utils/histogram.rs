//! Histograms used as the basis for the density estimates.
//!
//! # Overview
//!
//! [Histograms] partition a continuous distribution into consecutive,
//! non-overlapping bins and count how many observations fall in each. In
//! this module, the bins are described by their *edges*: `n` edges describe
//! `n - 1` bins. The rules for placing a value are:
//!
//! 1. Every bin is half-open, `[left, right)`, except the last one, which is
//!    closed, `[left, right]`. In other words, the maximum edge belongs to the
//!    last bin.
//! 2. Values below the first edge or above the last edge are out of bounds and
//!    are not counted.
//!
//! Edges are produced by a [`Scale`]: linear scales space edges evenly
//! between the minimum and maximum of the data, while logarithmic scales
//! space them evenly in log-space and pad the top edge by a tenth of a decade
//! so that the maximum value does not land exactly on it.
//!
//! # Usage
//!
//! ```
//! use lrqc::utils::histogram::{Histogram, Scale};
//!
//! let edges = Scale::Linear.edges(0.0, 10.0, 3).unwrap();
//! assert_eq!(edges, [0.0, 5.0, 10.0]);
//!
//! let mut hist = Histogram::with_edges(edges).unwrap();
//! hist.increment(0.0).unwrap();
//! hist.increment(5.0).unwrap();
//! hist.increment_by(10.0, 2.0).unwrap();
//!
//! assert_eq!(hist.values(), [1.0, 3.0]);
//! assert_eq!(hist.values_normalized(), [0.25, 0.75]);
//! ```
//!
//! Incrementing with a value that falls outside of the edges returns a
//! [`BinOutOfBoundsError`]:
//!
//! ```
//! use lrqc::utils::histogram::{BinOutOfBoundsError, Histogram};
//!
//! let mut hist = Histogram::with_edges(vec![0.0, 1.0]).unwrap();
//! assert_eq!(hist.increment(1.5).unwrap_err(), BinOutOfBoundsError);
//! ```
//!
//! [Histograms]: https://en.wikipedia.org/wiki/Histogram

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::errors::{check_bins, Error, Result};

//=======//
// Scale //
//=======//

/// How bin edges are spaced along an axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Evenly spaced edges.
    #[default]
    Linear,

    /// Edges evenly spaced in log10 space.
    Log,
}

impl FromStr for Scale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Scale::Linear),
            "log" => Ok(Scale::Log),
            _ => Err(Error::invalid(format!("unknown scale: {}", s))),
        }
    }
}

impl Scale {
    /// Upper padding (in decades) added to the top edge of a log scale.
    pub const LOG_PADDING: f64 = 0.1;

    /// Whether a value can be placed on this scale.
    pub fn accepts(&self, value: f64) -> bool {
        match self {
            Scale::Linear => value.is_finite(),
            Scale::Log => value.is_finite() && value > 0.0,
        }
    }

    /// Computes `nbins` edges spanning `[min, max]`.
    ///
    /// A degenerate linear range (`min == max`) is widened by one half on
    /// each side so that the single value still falls in a proper bin.
    pub fn edges(&self, min: f64, max: f64, nbins: usize) -> Result<Vec<f64>> {
        check_bins("number of bins", nbins)?;

        if !(self.accepts(min) && self.accepts(max)) || min > max {
            return Err(Error::invalid(format!(
                "cannot place the range [{}, {}] on a {:?} scale",
                min, max, self
            )));
        }

        Ok(match self {
            Scale::Linear if min == max => linspace(min - 0.5, max + 0.5, nbins),
            Scale::Linear => linspace(min, max, nbins),
            Scale::Log => {
                let mut edges = logspace(min.log10(), max.log10() + Self::LOG_PADDING, nbins);
                // Round-tripping through log10 must not push the minimum out
                // of the first bin.
                edges[0] = min;
                edges
            }
        })
    }
}

/// `num` evenly spaced values from `start` to `stop` (both included).
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut values = (0..num).map(|i| start + i as f64 * step).collect::<Vec<_>>();
            values[num - 1] = stop;
            values
        }
    }
}

/// `num` values evenly spaced in log10 space between `10^start` and
/// `10^stop` (both included).
pub fn logspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    linspace(start, stop, num)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}

/// Returns the index of the first edge greater than or equal to `value`.
///
/// This is "right-closed" digitization: a value `v` with
/// `edges[i - 1] < v <= edges[i]` gets index `i`, a value at or below the
/// first edge gets `0`, and a value above every edge gets `edges.len()`.
pub fn digitize_right(edges: &[f64], value: f64) -> usize {
    edges.partition_point(|e| *e < value)
}

//===========//
// Histogram //
//===========//

/// An error that occurs if we try to increment a bin of the histogram that is
/// out-of-bounds for that histogram.
#[derive(Debug, PartialEq, Eq)]
pub struct BinOutOfBoundsError;

/// A one dimensional histogram with explicit edges. For more in depth
/// information, please see the [module-level documentation].
///
/// [module-level documentation]: self
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Histogram {
    // Bin edges (one more than the number of bins).
    edges: Vec<f64>,
    // Vec-backed value store for the histogram.
    values: Vec<f64>,
}

impl Histogram {
    //=================//
    // Initializations //
    //=================//

    /// Creates an empty histogram over the given (non-decreasing) edges.
    pub fn with_edges(edges: Vec<f64>) -> Result<Self> {
        check_bins("number of edges", edges.len())?;

        if edges.windows(2).any(|w| !(w[0] <= w[1])) {
            return Err(Error::invalid("histogram edges must be non-decreasing"));
        }

        Ok(Self {
            values: vec![0.0; edges.len() - 1],
            edges,
        })
    }

    //=================================//
    // Getting and incrementing values //
    //=================================//

    /// The bin a value belongs to, if it falls within the edges.
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        bin_of(&self.edges, value)
    }

    /// Increments the bin holding `value` by one.
    pub fn increment(&mut self, value: f64) -> std::result::Result<(), BinOutOfBoundsError> {
        self.increment_by(value, 1.0)
    }

    /// Increments the bin holding `value` by the specified weight.
    pub fn increment_by(
        &mut self,
        value: f64,
        weight: f64,
    ) -> std::result::Result<(), BinOutOfBoundsError> {
        let bin = self.bin_of(value).ok_or(BinOutOfBoundsError)?;
        self.values[bin] += weight;
        Ok(())
    }

    /// The edges of the histogram.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// The right edge of every bin.
    pub fn right_edges(&self) -> &[f64] {
        &self.edges[1..]
    }

    /// Simply returns the values in the distribution by ref.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consumes the histogram, returning its edges and values.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.edges, self.values)
    }

    /// Normalizes the values so that they sum to one and returns them as a Vec.
    pub fn values_normalized(&self) -> Vec<f64> {
        let total = self.sum();
        self.values.iter().map(|x| x / total).collect()
    }

    /// Computes the sum of the values within the distribution.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

fn bin_of(edges: &[f64], value: f64) -> Option<usize> {
    let first = *edges.first()?;
    let last = *edges.last()?;

    if value.is_nan() || value < first || value > last {
        return None;
    }

    if value == last {
        return Some(edges.len() - 2);
    }

    Some(edges.partition_point(|e| *e <= value) - 1)
}

/// A two dimensional histogram. Values are addressed as `values[y][x]`: rows
/// are bins of the y axis and columns are bins of the x axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Histogram2d {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl Histogram2d {
    /// Creates an empty histogram over the given edges.
    pub fn with_edges(x_edges: Vec<f64>, y_edges: Vec<f64>) -> Result<Self> {
        // Reuse the one dimensional validation for each axis.
        let x = Histogram::with_edges(x_edges)?;
        let y = Histogram::with_edges(y_edges)?;

        Ok(Self {
            values: vec![vec![0.0; x.values.len()]; y.values.len()],
            x_edges: x.edges,
            y_edges: y.edges,
        })
    }

    /// Increments the cell holding `(x, y)` by one.
    pub fn increment(&mut self, x: f64, y: f64) -> std::result::Result<(), BinOutOfBoundsError> {
        let col = bin_of(&self.x_edges, x).ok_or(BinOutOfBoundsError)?;
        let row = bin_of(&self.y_edges, y).ok_or(BinOutOfBoundsError)?;
        self.values[row][col] += 1.0;
        Ok(())
    }

    /// The edges of the x axis.
    pub fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    /// The edges of the y axis.
    pub fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    /// The counts, addressed as `values[y][x]`.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Consumes the histogram, returning x edges, y edges, and values.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<Vec<f64>>) {
        (self.x_edges, self.y_edges, self.values)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    pub fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 3.0, 3), [3.0, 3.0, 3.0]);
        assert_eq!(linspace(2.0, 4.0, 1), [2.0]);
    }

    #[test]
    pub fn test_log_edges_are_padded() {
        let edges = Scale::Log.edges(10.0, 1000.0, 3).unwrap();
        assert_eq!(edges.len(), 3);
        assert!((edges[0] - 10.0).abs() < 1e-9);
        assert!((edges[2] - 10f64.powf(3.1)).abs() < 1e-6);
        assert!(edges[2] > 1000.0);
    }

    #[test]
    pub fn test_invalid_scales() {
        assert!(Scale::Log.edges(0.0, 10.0, 10).is_err());
        assert!(Scale::Linear.edges(0.0, 10.0, 1).is_err());
        assert!(Scale::Linear.edges(5.0, 1.0, 10).is_err());
        assert!("cubic".parse::<Scale>().is_err());
        assert_eq!("log".parse::<Scale>().unwrap(), Scale::Log);
    }

    #[test]
    pub fn test_degenerate_linear_range() {
        assert_eq!(Scale::Linear.edges(2.0, 2.0, 3).unwrap(), [1.5, 2.0, 2.5]);
    }

    #[test]
    pub fn test_bins_are_half_open_except_the_last() {
        let hist = Histogram::with_edges(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(hist.bin_of(0.0), Some(0));
        assert_eq!(hist.bin_of(0.999), Some(0));
        assert_eq!(hist.bin_of(1.0), Some(1));
        assert_eq!(hist.bin_of(3.0), Some(2));
        assert_eq!(hist.bin_of(3.1), None);
        assert_eq!(hist.bin_of(-0.1), None);
        assert_eq!(hist.bin_of(f64::NAN), None);
    }

    #[test]
    pub fn test_digitize_right() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(digitize_right(&edges, 0.0), 0);
        assert_eq!(digitize_right(&edges, 0.5), 1);
        assert_eq!(digitize_right(&edges, 1.0), 1);
        assert_eq!(digitize_right(&edges, 2.0), 2);
        assert_eq!(digitize_right(&edges, 2.5), 3);
    }

    #[test]
    pub fn test_invalid_edges() {
        assert!(Histogram::with_edges(vec![0.0]).is_err());
        assert!(Histogram::with_edges(vec![1.0, 0.0]).is_err());
    }

    #[test]
    pub fn test_two_dimensional_addressing() {
        let mut hist = Histogram2d::with_edges(vec![0.0, 1.0, 2.0], vec![0.0, 10.0]).unwrap();
        hist.increment(1.5, 5.0).unwrap();
        hist.increment(1.5, 10.0).unwrap();
        assert_eq!(hist.values(), [vec![0.0, 2.0]]);
        assert_eq!(hist.increment(5.0, 5.0).unwrap_err(), BinOutOfBoundsError);
    }
}
