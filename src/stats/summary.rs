//! Exact summary statistics over views and groups of reads.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::groups::group_rows;
use super::groups::GroupBy;
use super::median;
use super::n50;
use super::quantile_ladder;
use super::SECONDS_PER_HOUR;
use crate::errors::{Error, Result};
use crate::table::{Field, View, ViewLevel, Views};
use crate::utils::display::thousands;
use crate::utils::display::DecimalFormat;

//=========//
// Records //
//=========//

/// Summary statistics for the aligned subset of a view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentStats {
    /// Number of reads with alignment information.
    pub aligned_reads: usize,

    /// Total aligned length.
    pub aligned_bases: u64,

    /// N50 of the alignment lengths.
    pub align_n50: u64,

    /// Percentile ladder (0 through 100) of the alignment lengths.
    pub align_len_percentiles: Vec<f64>,

    /// Aligned bases divided by the total length of the references, when
    /// reference lengths were provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_coverage: Option<f64>,

    /// Inserted bases per aligned base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion_rate: Option<f64>,

    /// Deleted bases per aligned base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_rate: Option<f64>,

    /// Mismatched bases per aligned base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch_rate: Option<f64>,
}

/// Summary statistics for a set of reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Number of reads (including reads with a missing quality score).
    pub reads_number: usize,

    /// Total basecalled length.
    pub bases_number: u64,

    /// N50 of the read lengths.
    #[serde(rename = "N50")]
    pub n50: u64,

    /// Median read length.
    pub median_read_len: f64,

    /// Median of the mean quality scores, if any read has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_qscore: Option<f64>,

    /// Percentile ladder (0 through 100) of the read lengths.
    pub len_percentiles: Vec<f64>,

    /// Percentile ladder (0 through 100) of the mean quality scores. Empty
    /// if no read has a quality score.
    pub qual_score_percentiles: Vec<f64>,

    /// Time between the first and the last read start, in hours.
    pub run_duration_hours: f64,

    /// Number of distinct channels that produced a read.
    pub active_channels: usize,

    /// Number of distinct runs.
    pub runid_number: usize,

    /// Number of distinct barcodes, when the table has barcodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcodes_number: Option<usize>,

    /// Alignment statistics, when the table has alignments and at least one
    /// read is aligned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentStats>,
}

/// Statistics for one population level ("All Reads" or "Pass Reads").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Statistics over the whole level.
    pub general_stats: StatsRecord,

    /// Statistics per run, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id_stats: Option<IndexMap<String, StatsRecord>>,

    /// Statistics per barcode, when requested and available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode_stats: Option<IndexMap<String, StatsRecord>>,
}

//=============//
// Computation //
//=============//

/// Computes the summary statistics of a view.
///
/// All values are exact: the view is expected to be a full (not sampled)
/// view. Reference lengths, keyed by reference name, are only used for the
/// mean coverage. Fails with [`Error::InsufficientData`] on an empty view.
pub fn compute_stats(
    view: &View<'_>,
    references: Option<&IndexMap<String, u64>>,
) -> Result<StatsRecord> {
    if view.is_empty() {
        return Err(Error::insufficient(format!(
            "cannot compute statistics over zero {}",
            view.level().label().to_lowercase()
        )));
    }

    let table = view.table();
    let capabilities = table.capabilities();

    let lengths = view.counts(Field::ReadLen)?;
    let length_values = lengths.iter().map(|l| *l as f64).collect_vec();
    let len_percentiles = quantile_ladder(&length_values)?;

    // Missing quality scores only affect the quality fields.
    let qscores = view.values(Field::MeanQscore)?;
    let qual_score_percentiles = quantile_ladder(&qscores).unwrap_or_default();
    let median_qscore = median(&qscores).ok();

    let (first, last) = view
        .values(Field::StartTime)?
        .into_iter()
        .minmax_by(f64::total_cmp)
        .into_option()
        .unwrap_or((0.0, 0.0));

    let active_channels = view.rows().iter().map(|row| table.channel(*row)).unique().count();

    let barcodes_number = match capabilities.has_barcodes {
        true => Some(table.barcodes()?.count_distinct(view.rows())),
        false => None,
    };

    let alignment = match capabilities.has_alignment {
        true => compute_alignment_stats(view, references)?,
        false => None,
    };

    Ok(StatsRecord {
        reads_number: view.len(),
        bases_number: lengths.iter().sum(),
        n50: n50(&lengths)?,
        median_read_len: len_percentiles[50],
        median_qscore,
        len_percentiles,
        qual_score_percentiles,
        run_duration_hours: (last - first) / SECONDS_PER_HOUR,
        active_channels,
        runid_number: table.run_ids().count_distinct(view.rows()),
        barcodes_number,
        alignment,
    })
}

fn compute_alignment_stats(
    view: &View<'_>,
    references: Option<&IndexMap<String, u64>>,
) -> Result<Option<AlignmentStats>> {
    let aligned = view.counts(Field::AlignLen)?;
    if aligned.is_empty() {
        return Ok(None);
    }

    let aligned_bases: u64 = aligned.iter().sum();
    let align_values = aligned.iter().map(|l| *l as f64).collect_vec();

    let mean_coverage = references
        .map(|r| r.values().sum::<u64>())
        .filter(|total| *total > 0)
        .map(|total| aligned_bases as f64 / total as f64);

    let rate = |field: Field| -> Result<Option<f64>> {
        match view.table().capabilities().has_identity_freq && aligned_bases > 0 {
            true => Ok(Some(view.sum(field)? as f64 / aligned_bases as f64)),
            false => Ok(None),
        }
    };

    Ok(Some(AlignmentStats {
        aligned_reads: aligned.len(),
        aligned_bases,
        align_n50: n50(&aligned)?,
        align_len_percentiles: quantile_ladder(&align_values)?,
        mean_coverage,
        insertion_rate: rate(Field::Insertion)?,
        deletion_rate: rate(Field::Deletion)?,
        mismatch_rate: rate(Field::Mismatch)?,
    }))
}

/// Computes the summary statistics of every group of a view, in
/// lexicographic key order.
pub fn compute_grouped_stats(
    view: &View<'_>,
    by: GroupBy,
    references: Option<&IndexMap<String, u64>>,
) -> Result<IndexMap<String, StatsRecord>> {
    group_rows(view, by)?
        .into_iter()
        .map(|(key, rows)| {
            let stats = compute_stats(&view.subset(rows), references)?;
            Ok((key, stats))
        })
        .collect()
}

/// Computes the statistics of the "All Reads" and "Pass Reads" levels,
/// optionally split per run and per barcode.
///
/// The barcode split is silently left out when the table has no barcodes. A
/// level with no reads is skipped with a warning.
pub fn summary_stats(
    views: &Views<'_>,
    references: Option<&IndexMap<String, u64>>,
    run_id_split: bool,
    barcode_split: bool,
) -> Result<IndexMap<String, LevelStats>> {
    let mut results = IndexMap::new();

    for level in [ViewLevel::All, ViewLevel::Pass] {
        let view = views.full(level);
        if view.is_empty() {
            warn!("No {} found: skipping their statistics.", level.label().to_lowercase());
            continue;
        }

        debug!("Computing statistics for {}.", level.label().to_lowercase());
        let general_stats = compute_stats(view, references)?;

        let run_id_stats = match run_id_split {
            true => Some(compute_grouped_stats(view, GroupBy::RunId, references)?),
            false => None,
        };

        let has_barcodes = view.table().capabilities().has_barcodes;
        let barcode_stats = match barcode_split && has_barcodes {
            true => Some(compute_grouped_stats(view, GroupBy::Barcode, references)?),
            false => None,
        };

        results.insert(
            level.label().to_string(),
            LevelStats {
                general_stats,
                run_id_stats,
                barcode_stats,
            },
        );
    }

    Ok(results)
}

//=======//
// Table //
//=======//

/// A summary rendered as formatted text cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryTable {
    /// Column names.
    pub header: Vec<String>,

    /// Formatted rows, one per group (or a single row when ungrouped).
    pub rows: Vec<Vec<String>>,
}

const SUMMARY_COLUMNS: [&str; 7] = [
    "Reads",
    "Bases",
    "Med Read Length",
    "N50 Length",
    "Med Read Quality",
    "Active Channels",
    "Run Duration (h)",
];

/// Builds the summary table of a view: a single row for the whole view, or
/// one row per group prefixed by the group key.
pub fn summary_table(view: &View<'_>, group_by: Option<GroupBy>) -> Result<SummaryTable> {
    let mut header = Vec::new();
    let mut rows = Vec::new();

    match group_by {
        Some(by) => {
            header.push(by.label().to_string());
            for (key, stats) in compute_grouped_stats(view, by, None)? {
                let mut row = vec![key];
                row.extend(format_cells(&stats));
                rows.push(row);
            }
        }
        None => rows.push(format_cells(&compute_stats(view, None)?)),
    }

    header.extend(SUMMARY_COLUMNS.iter().map(|c| c.to_string()));
    Ok(SummaryTable { header, rows })
}

fn format_cells(stats: &StatsRecord) -> Vec<String> {
    vec![
        thousands(stats.reads_number as u64),
        thousands(stats.bases_number),
        DecimalFormat(stats.median_read_len).to_string(),
        DecimalFormat(stats.n50 as f64).to_string(),
        stats
            .median_qscore
            .map(|q| DecimalFormat(q).to_string())
            .unwrap_or_else(|| String::from("NA")),
        thousands(stats.active_channels as u64),
        DecimalFormat(stats.run_duration_hours).to_string(),
    ]
}
