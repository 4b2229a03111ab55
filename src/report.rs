//! Report generation: turning a [`ReportConfig`] into computed figures.
//!
//! A [`Session`] owns everything a report is computed from (the read table,
//! the four views, and optionally the reference lengths) and dispatches each
//! [`FigureRequest`] to the engine that computes it. Each figure is made of
//! one or more [`Panel`]s, one per population level (and per count level
//! where relevant), mirroring the "All Reads" / "Pass Reads" toggles of a
//! rendered report.
//!
//! Engine errors are local to a figure: [`Session::figures`] logs them and
//! carries on with the rest of the report.

pub mod config;
pub mod results;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub use self::config::{FigureKind, FigureParams, FigureRequest, ReportConfig};
pub use self::results::Results;

use crate::density::{density_1d, density_2d, Density1d, Density2d};
use crate::errors::{Error, Result};
use crate::stats::groups::{barcode_counts, GroupBy};
use crate::stats::summary::{summary_stats, summary_table, LevelStats, SummaryTable};
use crate::table::{Field, PassFilter, ReadTable, View, ViewLevel, Views};
use crate::temporal::{
    channel_activity, output_over_time, time_trend, ChannelActivity, CountLevel, OutputOverTime,
    TimeTrend,
};
use crate::utils::histogram::Scale;

//=========//
// Figures //
//=========//

/// The computed data behind a panel.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Series {
    /// A formatted summary table.
    Table(SummaryTable),
    /// A one dimensional density.
    Density1d(Density1d),
    /// A two dimensional density.
    Density2d(Density2d),
    /// Output over time.
    Output(OutputOverTime),
    /// A percentile trend over time.
    Trend(TimeTrend),
    /// Reads per barcode.
    Counts(Vec<(String, usize)>),
    /// Output per channel over time.
    ChannelActivity(ChannelActivity),
}

/// One panel of a figure (e.g., the "Pass Reads" version of a density).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Panel {
    /// Display label of the panel.
    pub label: String,
    /// The computed data.
    pub series: Series,
}

/// A computed figure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Figure {
    /// The kind of figure.
    #[serde(serialize_with = "serialize_kind")]
    pub kind: FigureKind,
    /// Its title.
    pub title: String,
    /// Its panels, in display order.
    pub panels: Vec<Panel>,
}

fn serialize_kind<S>(kind: &FigureKind, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(kind.name())
}

//=========//
// Session //
//=========//

/// Everything a report is computed from.
#[derive(Debug)]
pub struct Session<'a> {
    views: Views<'a>,
    references: Option<IndexMap<String, u64>>,
}

impl<'a> Session<'a> {
    /// Builds the views of a table: the pass view from `filter`, and both
    /// samples of at most `sample_size` reads drawn with `seed`.
    pub fn new(
        table: &'a ReadTable,
        filter: &PassFilter,
        sample_size: usize,
        seed: u64,
    ) -> Result<Self> {
        Ok(Self {
            views: Views::new(table, filter, sample_size, seed)?,
            references: None,
        })
    }

    /// Attaches reference lengths (used for the mean coverage).
    pub fn with_references(mut self, references: IndexMap<String, u64>) -> Self {
        self.references = Some(references);
        self
    }

    /// The backing read table.
    pub fn table(&self) -> &'a ReadTable {
        self.views.all.table()
    }

    /// The four views.
    pub fn views(&self) -> &Views<'a> {
        &self.views
    }

    /// The reference lengths, if any were attached.
    pub fn references(&self) -> Option<&IndexMap<String, u64>> {
        self.references.as_ref()
    }

    /// Computes the summary statistics of both levels. See
    /// [`summary_stats`].
    pub fn summary_stats(
        &self,
        run_id_split: bool,
        barcode_split: bool,
    ) -> Result<IndexMap<String, LevelStats>> {
        summary_stats(&self.views, self.references(), run_id_split, barcode_split)
    }

    /// Computes the summary statistics of both levels, split per run and per
    /// barcode, as written to the JSON summary.
    pub fn results(&self) -> Result<Results> {
        Ok(Results::new(self.summary_stats(true, true)?))
    }

    /// Computes a single figure.
    ///
    /// Capability requirements are checked before anything is computed. A
    /// panel whose view has too little data is left out, as long as at least
    /// one panel of the figure could be computed.
    pub fn figure(&self, request: &FigureRequest) -> Result<Figure> {
        let kind = request.kind;
        if let Some(capability) = kind.requires() {
            self.table().capabilities().require(capability)?;
        }

        debug!("Computing {} with {:?}.", kind, request.params);
        let params = &request.params;

        let panels = match (kind, params) {
            (FigureKind::Summary, _) => {
                self.panels(|v| Ok(Series::Table(summary_table(v, None)?)), false)
            }
            (FigureKind::BarcodeSummary, _) => self.panels(
                |v| Ok(Series::Table(summary_table(v, Some(GroupBy::Barcode))?)),
                false,
            ),
            (FigureKind::RunIdSummary, _) => self.panels(
                |v| Ok(Series::Table(summary_table(v, Some(GroupBy::RunId))?)),
                false,
            ),
            (FigureKind::BarcodeCounts, _) => {
                self.panels(|v| Ok(Series::Counts(barcode_counts(v)?)), false)
            }
            (FigureKind::ReadsLen1d, FigureParams::Distribution(p)) => {
                self.density_panels(Field::ReadLen, Scale::Log, p.nbins, p.smooth_sigma)
            }
            (FigureKind::ReadsQual1d, FigureParams::Distribution(p)) => {
                self.density_panels(Field::MeanQscore, Scale::Linear, p.nbins, p.smooth_sigma)
            }
            (FigureKind::AlignLen1d, FigureParams::Distribution(p)) => {
                self.density_panels(Field::AlignLen, Scale::Log, p.nbins, p.smooth_sigma)
            }
            (FigureKind::Identity1d, FigureParams::Distribution(p)) => {
                self.density_panels(Field::IdentityFreq, Scale::Linear, p.nbins, p.smooth_sigma)
            }
            (FigureKind::ReadsLenQual2d, FigureParams::JointDistribution(p)) => self.panels(
                |v| {
                    let (len, qual): (Vec<f64>, Vec<f64>) =
                        v.pairs(Field::ReadLen, Field::MeanQscore)?.into_iter().unzip();
                    let density = density_2d(
                        &len,
                        &qual,
                        Scale::Log,
                        Scale::Linear,
                        p.len_nbins,
                        p.qual_nbins,
                        p.smooth_sigma,
                    )?;
                    Ok(Series::Density2d(density))
                },
                true,
            ),
            (FigureKind::OutputOverTime, FigureParams::TimeSeries(p)) => {
                self.counted_panels(|v, level| {
                    Ok(Series::Output(output_over_time(
                        v,
                        level,
                        p.time_bins,
                        p.smooth_sigma,
                    )?))
                })
            }
            (FigureKind::LenOverTime, FigureParams::TimeSeries(p)) => self.panels(
                |v| Ok(Series::Trend(time_trend(v, Field::ReadLen, p.time_bins, p.smooth_sigma)?)),
                true,
            ),
            (FigureKind::QualOverTime, FigureParams::TimeSeries(p)) => self.panels(
                |v| {
                    Ok(Series::Trend(time_trend(
                        v,
                        Field::MeanQscore,
                        p.time_bins,
                        p.smooth_sigma,
                    )?))
                },
                true,
            ),
            (FigureKind::ChannelsActivity, FigureParams::ChannelActivity(p)) => {
                let n_channels = self.table().capabilities().n_channels();
                self.counted_panels(|v, level| {
                    Ok(Series::ChannelActivity(channel_activity(
                        v,
                        level,
                        n_channels,
                        p.time_bins,
                        p.smooth_sigma,
                        p.baseline,
                    )?))
                })
            }
            (kind, params) => Err(Error::invalid(format!(
                "parameters {:?} do not apply to {}",
                params, kind
            ))),
        }?;

        Ok(Figure {
            kind,
            title: request.title.clone(),
            panels,
        })
    }

    /// Computes every figure of a configuration, in order. Figures that fail
    /// are logged and left out.
    pub fn figures(&self, config: &ReportConfig) -> Vec<Figure> {
        let mut figures = Vec::new();

        for request in config.requests() {
            info!("  [*] Computing {}.", request.kind);
            match self.figure(request) {
                Ok(figure) => figures.push(figure),
                Err(e) => warn!("  [*] Skipping {}: {}", request.kind, e),
            }
        }

        figures
    }

    //=========//
    // Helpers //
    //=========//

    fn density_panels(
        &self,
        field: Field,
        scale: Scale,
        nbins: usize,
        sigma: f64,
    ) -> Result<Vec<Panel>> {
        self.panels(
            |v| Ok(Series::Density1d(density_1d(&v.values(field)?, scale, nbins, sigma)?)),
            true,
        )
    }

    // One panel per population level, on the sampled or the full views.
    fn panels<F>(&self, compute: F, sampled: bool) -> Result<Vec<Panel>>
    where
        F: Fn(&View<'a>) -> Result<Series>,
    {
        let results = [ViewLevel::All, ViewLevel::Pass].map(|level| {
            let view = match sampled {
                true => self.views.sampled(level),
                false => self.views.full(level),
            };

            compute(view).map(|series| Panel {
                label: level.label().to_string(),
                series,
            })
        });

        collect_panels(results)
    }

    // One panel per population level and count level, on the sampled views.
    fn counted_panels<F>(&self, compute: F) -> Result<Vec<Panel>>
    where
        F: Fn(&View<'a>, CountLevel) -> Result<Series>,
    {
        let mut results = Vec::new();
        for count_level in [CountLevel::Reads, CountLevel::Bases] {
            for level in [ViewLevel::All, ViewLevel::Pass] {
                let view = self.views.sampled(level);
                let label = format!("{} {}", level.label().replace(" Reads", ""), count_level);
                results.push(compute(view, count_level).map(|series| Panel { label, series }));
            }
        }

        collect_panels(results)
    }
}

// Drops panels without enough data, unless every panel lacks data. Any other
// error fails the whole figure.
fn collect_panels<I>(results: I) -> Result<Vec<Panel>>
where
    I: IntoIterator<Item = Result<Panel>>,
{
    let mut panels = Vec::new();
    let mut insufficient = None;

    for result in results {
        match result {
            Ok(panel) => panels.push(panel),
            Err(Error::InsufficientData(message)) => {
                debug!("Leaving a panel out: {}", message);
                insufficient.get_or_insert(Error::InsufficientData(message));
            }
            Err(e) => return Err(e),
        }
    }

    match (panels.is_empty(), insufficient) {
        (true, Some(e)) => Err(e),
        _ => Ok(panels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Capability;
    use crate::table::tests::fixture;
    use crate::table::{ReadRecord, Schema};

    fn session(table: &ReadTable) -> Session<'_> {
        Session::new(table, &PassFilter::default(), 100, 42).unwrap()
    }

    #[test]
    fn test_every_default_figure_on_fixture() {
        let table = fixture();
        let session = session(&table);
        let figures = session.figures(&ReportConfig::default());

        // The fixture has barcodes but no alignments.
        let kinds = figures.iter().map(|f| f.kind).collect::<Vec<_>>();
        assert!(kinds.contains(&FigureKind::BarcodeSummary));
        assert!(!kinds.contains(&FigureKind::AlignLen1d));
        assert!(!kinds.contains(&FigureKind::Identity1d));
        assert_eq!(kinds.len(), FigureKind::ALL.len() - 2);
    }

    #[test]
    fn test_panels_per_level() {
        let table = fixture();
        let session = session(&table);

        let figure = session.figure(&FigureRequest::new(FigureKind::ReadsQual1d)).unwrap();
        let labels = figure.panels.iter().map(|p| p.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["All Reads", "Pass Reads"]);
        assert_eq!(figure.title, "Distribution of read quality scores");

        let figure = session.figure(&FigureRequest::new(FigureKind::OutputOverTime)).unwrap();
        let labels = figure.panels.iter().map(|p| p.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["All Reads", "Pass Reads", "All Bases", "Pass Bases"]);
    }

    #[test]
    fn test_capability_is_checked_first() {
        let mut builder = ReadTable::builder(Schema::default());
        builder.push(ReadRecord::new("run", 1, 0.0, 100, 9.0)).unwrap();
        let table = builder.build();
        let session = session(&table);

        assert_eq!(
            session.figure(&FigureRequest::new(FigureKind::BarcodeCounts)),
            Err(Error::CapabilityUnavailable(Capability::Barcodes))
        );
    }

    #[test]
    fn test_empty_pass_level_is_left_out() {
        let mut builder = ReadTable::builder(Schema::default());
        builder.push(ReadRecord::new("run", 1, 0.0, 100, 3.0)).unwrap();
        builder.push(ReadRecord::new("run", 2, 60.0, 200, 4.0)).unwrap();
        let table = builder.build();
        let session = session(&table);

        let figure = session.figure(&FigureRequest::new(FigureKind::ReadsLen1d)).unwrap();
        assert_eq!(figure.panels.len(), 1);
        assert_eq!(figure.panels[0].label, "All Reads");
    }

    #[test]
    fn test_mismatched_parameters_are_rejected() {
        let table = fixture();
        let session = session(&table);
        let request = FigureRequest {
            kind: FigureKind::ReadsLen1d,
            title: String::from("Lengths"),
            params: FigureParams::None,
        };
        assert!(matches!(session.figure(&request), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_results_cover_both_levels() {
        let table = fixture();
        let results = session(&table).results().unwrap();
        assert_eq!(results.levels.len(), 2);
        assert!(results.levels["All Reads"].run_id_stats.is_some());
    }
}
