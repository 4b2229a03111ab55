//! Smoothed one and two dimensional density estimates.
//!
//! Densities are histograms of raw counts (not normalized probability
//! densities) smoothed with a Gaussian kernel. They are computed on sampled
//! views and are never rescaled: only their shape and medians matter.

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::errors::{check_bins, check_sigma, Error, Result};
use crate::stats::percentiles;
use crate::utils::histogram::{Histogram, Histogram2d, Scale};
use crate::utils::smoothing::{gaussian_filter1d, gaussian_filter2d};

/// Percentiles overlaid on one dimensional densities.
pub const MARKER_PERCENTILES: [f64; 5] = [10.0, 25.0, 50.0, 75.0, 90.0];

const MARKER_LABELS: [&str; 5] = ["10%", "25%", "Median", "75%", "90%"];

/// A percentile of the raw data, used as an overlay on a density.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    /// Display label (e.g., `Median`).
    pub label: &'static str,

    /// The percentile (`0.0..=100.0`).
    pub percentile: f64,

    /// The value of the percentile.
    pub value: f64,
}

//=========//
// 1D data //
//=========//

/// A smoothed one dimensional density.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Density1d {
    /// Bin edges (one more than the number of bins).
    pub edges: Vec<f64>,

    /// The x coordinate of every bin (its right edge).
    pub x: Vec<f64>,

    /// Smoothed counts per bin.
    pub counts: Vec<f64>,

    /// The 10th, 25th, 50th, 75th and 90th percentiles of the raw data.
    pub markers: Vec<Marker>,

    /// The largest smoothed count.
    pub y_max: f64,
}

/// Builds a smoothed density of the given values.
///
/// `nbins` is the number of bin *edges* (at least 2). Missing values are
/// dropped, as are non-positive values on a log scale. A sigma of zero
/// disables smoothing.
///
/// ```
/// use lrqc::density::density_1d;
/// use lrqc::utils::histogram::Scale;
///
/// let density = density_1d(&[1.0, 2.0, 3.0, 4.0, 5.0], Scale::Linear, 5, 0.0).unwrap();
/// assert_eq!(density.x, [2.0, 3.0, 4.0, 5.0]);
/// assert_eq!(density.counts, [1.0, 1.0, 1.0, 2.0]);
/// assert_eq!(density.markers[2].value, 3.0);
/// ```
pub fn density_1d(values: &[f64], scale: Scale, nbins: usize, sigma: f64) -> Result<Density1d> {
    check_bins("nbins", nbins)?;
    check_sigma(sigma)?;

    let data = values
        .iter()
        .copied()
        .filter(|v| scale.accepts(*v))
        .collect_vec();

    let (min, max) = data
        .iter()
        .copied()
        .minmax_by(f64::total_cmp)
        .into_option()
        .ok_or_else(|| Error::insufficient("no values to estimate a density from"))?;

    debug!(
        "Density over {} values in [{}, {}] ({:?}, {} edges, sigma {}).",
        data.len(),
        min,
        max,
        scale,
        nbins,
        sigma
    );

    // (1) Count the raw values.
    let mut hist = Histogram::with_edges(scale.edges(min, max, nbins)?)?;
    let out_of_bounds = data
        .iter()
        .filter(|value| hist.increment(**value).is_err())
        .count();
    if out_of_bounds > 0 {
        debug!("{} values fell outside of the density edges.", out_of_bounds);
    }

    // (2) Smooth the raw counts.
    let (edges, counts) = hist.into_parts();
    let counts = gaussian_filter1d(&counts, sigma)?;
    let y_max = counts.iter().copied().fold(0.0, f64::max);

    // (3) Percentiles of the unsmoothed data.
    let markers = percentiles(&data, &MARKER_PERCENTILES)?
        .into_iter()
        .zip(MARKER_PERCENTILES.iter().zip(MARKER_LABELS.iter()))
        .map(|(value, (percentile, label))| Marker {
            label: *label,
            percentile: *percentile,
            value,
        })
        .collect();

    Ok(Density1d {
        x: edges[1..].to_vec(),
        edges,
        counts,
        markers,
        y_max,
    })
}

//=========//
// 2D data //
//=========//

/// A smoothed two dimensional density.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Density2d {
    /// Bin edges of the x axis.
    pub x_edges: Vec<f64>,

    /// Bin edges of the y axis.
    pub y_edges: Vec<f64>,

    /// Smoothed counts addressed as `z[y][x]`.
    pub z: Vec<Vec<f64>>,

    /// Smallest smoothed count.
    pub z_min: f64,

    /// Largest smoothed count.
    pub z_max: f64,

    /// Median of the x values.
    pub x_median: f64,

    /// Median of the y values.
    pub y_median: f64,
}

/// Builds a smoothed joint density of paired values.
///
/// Pairs where either value is missing (or non-positive on a log axis) are
/// dropped. Each axis is binned independently following the same rules as
/// [`density_1d`]. The reported medians are the medians of each marginal,
/// not the centroid of the matrix.
pub fn density_2d(
    x: &[f64],
    y: &[f64],
    x_scale: Scale,
    y_scale: Scale,
    x_nbins: usize,
    y_nbins: usize,
    sigma: f64,
) -> Result<Density2d> {
    check_bins("x_nbins", x_nbins)?;
    check_bins("y_nbins", y_nbins)?;
    check_sigma(sigma)?;

    if x.len() != y.len() {
        return Err(Error::invalid(format!(
            "x and y must have the same length ({} != {})",
            x.len(),
            y.len()
        )));
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| x_scale.accepts(**a) && y_scale.accepts(**b))
        .map(|(a, b)| (*a, *b))
        .unzip();

    if xs.is_empty() {
        return Err(Error::insufficient("no pairs to estimate a density from"));
    }

    // (1) Percentiles of each marginal: [min, median, max].
    let px = percentiles(&xs, &[0.0, 50.0, 100.0])?;
    let py = percentiles(&ys, &[0.0, 50.0, 100.0])?;

    // (2) Count and smooth.
    let mut hist = Histogram2d::with_edges(
        x_scale.edges(px[0], px[2], x_nbins)?,
        y_scale.edges(py[0], py[2], y_nbins)?,
    )?;
    let out_of_bounds = xs
        .iter()
        .zip(&ys)
        .filter(|(a, b)| hist.increment(**a, **b).is_err())
        .count();
    if out_of_bounds > 0 {
        debug!("{} pairs fell outside of the density edges.", out_of_bounds);
    }

    let (x_edges, y_edges, z) = hist.into_parts();
    let z = gaussian_filter2d(&z, sigma)?;

    let (z_min, z_max) = z
        .iter()
        .flatten()
        .copied()
        .minmax_by(f64::total_cmp)
        .into_option()
        .unwrap_or((0.0, 0.0));

    Ok(Density2d {
        x_edges,
        y_edges,
        z,
        z_min,
        z_max,
        x_median: px[1],
        y_median: py[1],
    })
}
