//! Time-of-run binning: trends, output over time, and channel activity.
//!
//! Start times are converted to hours and split into equal-width bins
//! whose edges run from the first to the last read start. Reads are placed
//! with right-closed digitization: a read at time `t` lands in the bin of the
//! first edge greater than or equal to `t`. Every series in this module is
//! therefore indexed by edge, and the time coordinate of bin `i` is `edges[i]`.
//!
//! All operations run on (possibly sampled) views. Absolute counts are
//! multiplied by the view's scaling factor; percentile trends are not.

use std::fmt;

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::errors::{check_bins, check_sigma, Error, Result};
use crate::stats::percentiles;
use crate::stats::SECONDS_PER_HOUR;
use crate::table::{Field, View};
use crate::utils::histogram::{digitize_right, linspace};
use crate::utils::smoothing::{gaussian_filter1d, gaussian_filter_columns};

/// Percentages of the final output marked on output-over-time series.
pub const OUTPUT_PERCENTS: [f64; 5] = [50.0, 75.0, 90.0, 99.0, 100.0];

//======//
// Bins //
//======//

/// Equal-width time bins spanning the start times of a set of reads.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeBins {
    edges: Vec<f64>,
}

impl TimeBins {
    /// Builds `time_bins` edges (in hours) from the first to the last of the
    /// given times.
    pub fn new(hours: &[f64], time_bins: usize) -> Result<Self> {
        check_bins("time_bins", time_bins)?;

        let (first, last) = hours
            .iter()
            .copied()
            .minmax_by(f64::total_cmp)
            .into_option()
            .ok_or_else(|| Error::insufficient("no reads to bin over time"))?;

        Ok(Self {
            edges: linspace(first, last, time_bins),
        })
    }

    /// Builds the bins from the start times of a view.
    pub fn from_view(view: &View<'_>, time_bins: usize) -> Result<Self> {
        Self::new(&hours(view)?, time_bins)
    }

    /// The bin edges (one per bin), in hours.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Always false: bins are built from at least two edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The bin of a time (in hours). Times outside of the edges are clamped
    /// to the first or last bin.
    pub fn bin_of(&self, hours: f64) -> usize {
        digitize_right(&self.edges, hours).min(self.edges.len() - 1)
    }
}

fn hours(view: &View<'_>) -> Result<Vec<f64>> {
    Ok(view
        .values(Field::StartTime)?
        .into_iter()
        .map(|s| s / SECONDS_PER_HOUR)
        .collect())
}

//=============//
// Count level //
//=============//

/// What output is measured in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountLevel {
    /// Number of reads.
    Reads,

    /// Number of bases.
    Bases,
}

impl CountLevel {
    /// The amount a read contributes at this level.
    fn weight(&self, view: &View<'_>, row: usize) -> f64 {
        match self {
            CountLevel::Reads => 1.0,
            CountLevel::Bases => view.table().read_len(row) as f64,
        }
    }
}

impl fmt::Display for CountLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountLevel::Reads => write!(f, "Reads"),
            CountLevel::Bases => write!(f, "Bases"),
        }
    }
}

//=======//
// Trend //
//=======//

/// Per-bin distribution of a field over time. Bins without reads are NaN.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeTrend {
    /// Time coordinate of each bin, in hours.
    pub x: Vec<f64>,
    /// Minimum per bin.
    pub min: Vec<f64>,
    /// Maximum per bin.
    pub max: Vec<f64>,
    /// 25th percentile per bin.
    pub q25: Vec<f64>,
    /// Median per bin.
    pub median: Vec<f64>,
    /// 75th percentile per bin.
    pub q75: Vec<f64>,
}

/// Computes the minimum, maximum, quartiles, and median of a field in every
/// time bin, then smooths each series. Empty bins stay NaN through the
/// smoothing.
///
/// The bins span the start times of every read of the view, so the time axis
/// matches the other temporal series even when some reads lack the field.
pub fn time_trend(view: &View<'_>, field: Field, time_bins: usize, sigma: f64) -> Result<TimeTrend> {
    check_bins("time_bins", time_bins)?;
    check_sigma(sigma)?;

    let bins = TimeBins::from_view(view, time_bins)?;
    let pairs = view.pairs(Field::StartTime, field)?;
    if pairs.is_empty() {
        return Err(Error::insufficient(format!(
            "no values of {} to follow over time",
            field.name()
        )));
    }

    // (1) Collect the values of every bin.
    let mut binned: Vec<Vec<f64>> = vec![Vec::new(); bins.len()];
    for (t, value) in &pairs {
        binned[bins.bin_of(t / SECONDS_PER_HOUR)].push(*value);
    }

    // (2) Summarize each bin as [min, max, 25%, 75%, median].
    let mut stats: [Vec<f64>; 5] = Default::default();
    for values in &binned {
        let p = match values.is_empty() {
            true => vec![f64::NAN; 5],
            false => percentiles(values, &[0.0, 100.0, 25.0, 75.0, 50.0])?,
        };

        for (series, v) in stats.iter_mut().zip(p) {
            series.push(v);
        }
    }

    // (3) Smooth.
    let [min, max, q25, q75, median] = stats;
    debug!(
        "Trend of {} over {} bins ({} empty).",
        field.name(),
        bins.len(),
        binned.iter().filter(|b| b.is_empty()).count()
    );

    Ok(TimeTrend {
        x: bins.edges().to_vec(),
        min: gaussian_filter1d(&min, sigma)?,
        max: gaussian_filter1d(&max, sigma)?,
        q25: gaussian_filter1d(&q25, sigma)?,
        median: gaussian_filter1d(&median, sigma)?,
        q75: gaussian_filter1d(&q75, sigma)?,
    })
}

//=============//
// Output/time //
//=============//

/// The time at which a given share of the final output was reached.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputMarker {
    /// Share of the final output, in percent.
    pub percent: f64,

    /// Time coordinate of the bin whose cumulative output is closest to the
    /// target.
    pub time: f64,

    /// Cumulative output in that bin.
    pub value: f64,
}

/// Cumulative and per-interval output over time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputOverTime {
    /// What the output is measured in.
    pub level: CountLevel,
    /// Time coordinate of each bin, in hours.
    pub x: Vec<f64>,
    /// Cumulative output at each bin.
    pub cumulative: Vec<f64>,
    /// Smoothed per-bin output, rescaled so that its maximum equals the
    /// final cumulative output.
    pub interval: Vec<f64>,
    /// Times at which 50, 75, 90, 99 and 100 percent of the output was
    /// reached.
    pub markers: Vec<OutputMarker>,
}

/// Computes the output (reads or bases) produced over the course of a run.
///
/// Per-bin counts are multiplied by the scaling factor of the view. The
/// interval series is smoothed with the given sigma and then rescaled to the
/// maximum of the cumulative series (it is left as-is if it is zero
/// everywhere).
pub fn output_over_time(
    view: &View<'_>,
    level: CountLevel,
    time_bins: usize,
    sigma: f64,
) -> Result<OutputOverTime> {
    check_bins("time_bins", time_bins)?;
    check_sigma(sigma)?;

    let bins = TimeBins::from_view(view, time_bins)?;
    let sf = view.scaling_factor();

    // (1) Count per bin.
    let mut counts = vec![0.0; bins.len()];
    for row in view.rows() {
        let t = view.table().start_time(*row) / SECONDS_PER_HOUR;
        counts[bins.bin_of(t)] += level.weight(view, *row);
    }

    for c in counts.iter_mut() {
        *c *= sf;
    }

    // (2) Cumulate.
    let cumulative = counts
        .iter()
        .scan(0.0, |acc, c| {
            *acc += c;
            Some(*acc)
        })
        .collect_vec();
    let total = cumulative.last().copied().unwrap_or_default();

    // (3) Smooth the interval series and rescale it to the cumulative total.
    let mut interval = gaussian_filter1d(&counts, sigma)?;
    let peak = interval.iter().copied().fold(0.0, f64::max);
    if peak > 0.0 {
        for v in interval.iter_mut() {
            *v = *v * total / peak;
        }
    }

    // (4) Locate the bins closest to each share of the output.
    let markers = OUTPUT_PERCENTS
        .iter()
        .map(|percent| {
            let target = total * percent / 100.0;
            let idx = cumulative
                .iter()
                .map(|c| (c - target).abs())
                .position_min_by(f64::total_cmp)
                .unwrap_or_default();

            OutputMarker {
                percent: *percent,
                time: bins.edges()[idx],
                value: cumulative[idx],
            }
        })
        .collect();

    Ok(OutputOverTime {
        level,
        x: bins.edges().to_vec(),
        cumulative,
        interval,
        markers,
    })
}

//==================//
// Channel activity //
//==================//

/// Output per channel over time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelActivity {
    /// What the output is measured in.
    pub level: CountLevel,
    /// Time coordinate of each row of the matrix, in hours.
    pub time_edges: Vec<f64>,
    /// Number of channels (columns of the matrix).
    pub n_channels: u32,
    /// Output addressed as `matrix[time_bin][channel - 1]`.
    pub matrix: Vec<Vec<f64>>,
}

/// Computes a `time_bins × n_channels` matrix of output per channel.
///
/// Every cell starts at `baseline` (0 by default in reports; older reports
/// used 1), is incremented by each read's weight, multiplied by the scaling
/// factor, and finally smoothed along the time axis only.
///
/// ```
/// use lrqc::table::{ReadRecord, ReadTable, Schema, View};
/// use lrqc::temporal::{channel_activity, CountLevel};
///
/// let mut builder = ReadTable::builder(Schema::default());
/// builder.push(ReadRecord::new("run", 5, 0.0, 100, 9.0)).unwrap();
/// builder.push(ReadRecord::new("run", 5, 0.0, 100, 9.0)).unwrap();
/// let table = builder.build();
///
/// let activity = channel_activity(&View::all(&table), CountLevel::Reads, 10, 2, 0.0, 1.0).unwrap();
/// assert_eq!(activity.matrix[0][4], 3.0);
/// assert_eq!(activity.matrix[1][4], 1.0);
/// ```
pub fn channel_activity(
    view: &View<'_>,
    level: CountLevel,
    n_channels: u32,
    time_bins: usize,
    sigma: f64,
    baseline: f64,
) -> Result<ChannelActivity> {
    check_bins("time_bins", time_bins)?;
    check_sigma(sigma)?;

    if n_channels == 0 {
        return Err(Error::invalid("n_channels must be greater than zero"));
    }

    if !baseline.is_finite() {
        return Err(Error::invalid(format!("baseline must be finite (got {})", baseline)));
    }

    let table = view.table();
    if let Some(channel) = view.rows().iter().map(|row| table.channel(*row)).max() {
        if channel > n_channels {
            return Err(Error::invalid(format!(
                "channel {} is above the number of channels ({})",
                channel, n_channels
            )));
        }
    }

    let bins = TimeBins::from_view(view, time_bins)?;

    // (1) Accumulate on top of the baseline.
    let mut matrix = vec![vec![baseline; n_channels as usize]; bins.len()];
    for row in view.rows() {
        let bin = bins.bin_of(table.start_time(*row) / SECONDS_PER_HOUR);
        let channel = (table.channel(*row) - 1) as usize;
        matrix[bin][channel] += level.weight(view, *row);
    }

    // (2) Rescale and smooth along time.
    let sf = view.scaling_factor();
    for v in matrix.iter_mut().flatten() {
        *v *= sf;
    }

    Ok(ChannelActivity {
        level,
        time_edges: bins.edges().to_vec(),
        n_channels,
        matrix: gaussian_filter_columns(&matrix, sigma)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ReadRecord, ReadTable, Schema};

    fn table_of(reads: &[(u32, f64, u64, f64)]) -> ReadTable {
        let mut builder = ReadTable::builder(Schema::default());
        for (channel, start_time, read_len, qscore) in reads {
            builder
                .push(ReadRecord::new("run", *channel, *start_time, *read_len, *qscore))
                .unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_time_bins_are_right_closed() {
        let bins = TimeBins::new(&[0.0, 2.0], 3).unwrap();
        assert_eq!(bins.edges(), [0.0, 1.0, 2.0]);
        assert_eq!(bins.bin_of(0.0), 0);
        assert_eq!(bins.bin_of(0.5), 1);
        assert_eq!(bins.bin_of(1.0), 1);
        assert_eq!(bins.bin_of(1.5), 2);
        assert_eq!(bins.bin_of(2.0), 2);
        assert_eq!(bins.bin_of(9.0), 2);

        assert!(matches!(TimeBins::new(&[], 3), Err(Error::InsufficientData(_))));
        assert!(matches!(TimeBins::new(&[1.0], 1), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_time_trend_keeps_empty_bins_missing() {
        let table = table_of(&[
            (1, 0.0, 100, 8.0),
            (1, 0.0, 100, 10.0),
            (1, 3.0 * 3600.0, 100, 12.0),
        ]);
        let view = View::all(&table);

        let trend = time_trend(&view, Field::MeanQscore, 4, 0.0).unwrap();
        assert_eq!(trend.x, [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(trend.min[0], 8.0);
        assert_eq!(trend.max[0], 10.0);
        assert_eq!(trend.median[0], 9.0);
        assert_eq!(trend.q25[0], 8.5);
        assert_eq!(trend.q75[0], 9.5);
        assert!(trend.median[1].is_nan() && trend.median[2].is_nan());
        assert_eq!(trend.median[3], 12.0);

        let smoothed = time_trend(&view, Field::MeanQscore, 4, 1.0).unwrap();
        assert!(smoothed.median[1].is_nan() && smoothed.median[2].is_nan());
        assert!(smoothed.median[0] > 9.0 && smoothed.median[3] < 12.0);
    }

    #[test]
    fn test_time_trend_shares_the_time_axis_of_the_view() {
        let table = table_of(&[
            (1, 0.0, 100, 8.0),
            (1, 3600.0, 200, 9.0),
            (2, 4.0 * 3600.0, 300, f64::NAN),
        ]);
        let view = View::all(&table);

        let qual = time_trend(&view, Field::MeanQscore, 5, 0.0).unwrap();
        let len = time_trend(&view, Field::ReadLen, 5, 0.0).unwrap();
        let output = output_over_time(&view, CountLevel::Reads, 5, 0.0).unwrap();

        assert_eq!(qual.x, [0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(qual.x, output.x);
        assert_eq!(qual.x, len.x);
        assert_eq!(qual.median[1], 9.0);
        assert!(qual.median[4].is_nan());
        assert_eq!(len.median[4], 300.0);

        let unscored = table_of(&[(1, 0.0, 100, f64::NAN), (1, 60.0, 100, f64::NAN)]);
        assert!(matches!(
            time_trend(&View::all(&unscored), Field::MeanQscore, 5, 0.0),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_output_over_time() {
        let table = table_of(&[
            (1, 0.0, 10, 9.0),
            (1, 3600.0, 20, 9.0),
            (2, 3600.0, 30, 9.0),
            (2, 7200.0, 40, 9.0),
        ]);
        let view = View::all(&table);

        let reads = output_over_time(&view, CountLevel::Reads, 3, 0.0).unwrap();
        assert_eq!(reads.cumulative, [1.0, 3.0, 4.0]);
        assert_eq!(reads.interval, [2.0, 4.0, 2.0]);

        let times = reads.markers.iter().map(|m| m.time).collect_vec();
        assert_eq!(times, [0.0, 1.0, 2.0, 2.0, 2.0]);
        assert_eq!(reads.markers[0].value, 1.0);

        let bases = output_over_time(&view, CountLevel::Bases, 3, 1.0).unwrap();
        assert_eq!(*bases.cumulative.last().unwrap(), 100.0);
        let peak = bases.interval.iter().copied().fold(0.0, f64::max);
        assert!((peak - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_is_rescaled_by_the_scaling_factor() {
        let table = table_of(&[(1, 0.0, 10, 9.0), (1, 3600.0, 10, 9.0)]);
        let view = View::all(&table);
        let sampled = view.resampled(view.rows().to_vec(), 2.5);

        let output = output_over_time(&sampled, CountLevel::Reads, 2, 0.0).unwrap();
        assert_eq!(output.cumulative, [2.5, 5.0]);
    }

    #[test]
    fn test_channel_activity_baseline_and_smoothing_axis() {
        let table = table_of(&[
            (5, 0.0, 100, 9.0),
            (5, 0.0, 100, 9.0),
            (1, 3600.0, 50, 9.0),
        ]);
        let view = View::all(&table);

        let activity = channel_activity(&view, CountLevel::Reads, 10, 4, 0.0, 1.0).unwrap();
        assert_eq!(activity.matrix.len(), 4);
        assert_eq!(activity.matrix[0][4], 3.0);
        assert_eq!(activity.matrix[3][0], 2.0);
        assert_eq!(activity.matrix[1][4], 1.0);

        let bases = channel_activity(&view, CountLevel::Bases, 10, 4, 0.0, 0.0).unwrap();
        assert_eq!(bases.matrix[0][4], 200.0);

        // Smoothing never moves output across channels.
        let smoothed = channel_activity(&view, CountLevel::Reads, 10, 4, 1.0, 0.0).unwrap();
        let channel_5: f64 = smoothed.matrix.iter().map(|row| row[4]).sum();
        assert!((channel_5 - 2.0).abs() < 1e-9);
        assert!(smoothed.matrix.iter().all(|row| row[2] == 0.0));
    }

    #[test]
    fn test_channel_activity_rejects_out_of_range_channels() {
        let table = table_of(&[(700, 0.0, 100, 9.0)]);
        let view = View::all(&table);
        assert!(matches!(
            channel_activity(&view, CountLevel::Reads, 512, 4, 1.0, 1.0),
            Err(Error::InvalidParameter(_))
        ));

        let empty = view.subset(Vec::new());
        assert!(matches!(
            channel_activity(&empty, CountLevel::Reads, 512, 4, 1.0, 1.0),
            Err(Error::InsufficientData(_))
        ));
    }
}
