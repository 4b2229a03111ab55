//! The figure kinds a report can contain and the configuration that selects
//! and parameterizes them.
//!
//! A configuration file is a JSON object whose keys are figure kind names and
//! whose values are objects of parameters, for example:
//!
//! ```json
//! {
//!     "reads_len_1D": { "nbins": 100, "smooth_sigma": 1 },
//!     "channels_activity": { "time_bins": 50, "plot_title": "Activity" }
//! }
//! ```
//!
//! Figures are produced in the order of the keys. Parameters a figure does
//! not know about (such as the colors accepted by other tools) are ignored,
//! but an unknown figure kind is a configuration error.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::errors::{Capability, Error, Result};

//=============//
// Figure kind //
//=============//

/// Every figure a report can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FigureKind {
    /// Overall summary table.
    Summary,
    /// Summary table per barcode.
    BarcodeSummary,
    /// Summary table per run.
    RunIdSummary,
    /// Distribution of read lengths.
    ReadsLen1d,
    /// Distribution of mean read quality scores.
    ReadsQual1d,
    /// Distribution of alignment lengths.
    AlignLen1d,
    /// Distribution of alignment identity frequencies.
    Identity1d,
    /// Joint distribution of read length and quality.
    ReadsLenQual2d,
    /// Cumulative and interval output over time.
    OutputOverTime,
    /// Read length trend over time.
    LenOverTime,
    /// Read quality trend over time.
    QualOverTime,
    /// Number of reads per barcode.
    BarcodeCounts,
    /// Output per channel over time.
    ChannelsActivity,
}

impl FigureKind {
    /// All figure kinds, in default report order.
    pub const ALL: [FigureKind; 13] = [
        FigureKind::Summary,
        FigureKind::BarcodeSummary,
        FigureKind::RunIdSummary,
        FigureKind::ReadsLen1d,
        FigureKind::ReadsQual1d,
        FigureKind::AlignLen1d,
        FigureKind::Identity1d,
        FigureKind::ReadsLenQual2d,
        FigureKind::OutputOverTime,
        FigureKind::LenOverTime,
        FigureKind::QualOverTime,
        FigureKind::BarcodeCounts,
        FigureKind::ChannelsActivity,
    ];

    /// The name used for this kind in configuration files and output
    /// filenames.
    pub fn name(&self) -> &'static str {
        match self {
            FigureKind::Summary => "summary",
            FigureKind::BarcodeSummary => "barcode_summary",
            FigureKind::RunIdSummary => "run_id_summary",
            FigureKind::ReadsLen1d => "reads_len_1D",
            FigureKind::ReadsQual1d => "reads_qual_1D",
            FigureKind::AlignLen1d => "align_len_1D",
            FigureKind::Identity1d => "identity_1D",
            FigureKind::ReadsLenQual2d => "reads_len_qual_2D",
            FigureKind::OutputOverTime => "output_over_time",
            FigureKind::LenOverTime => "len_over_time",
            FigureKind::QualOverTime => "qual_over_time",
            FigureKind::BarcodeCounts => "barcode_counts",
            FigureKind::ChannelsActivity => "channels_activity",
        }
    }

    /// A one line description of the figure.
    pub fn description(&self) -> &'static str {
        match self {
            FigureKind::Summary => "Reads, bases, N50, medians, and run duration for the whole run.",
            FigureKind::BarcodeSummary => "The run summary split by barcode.",
            FigureKind::RunIdSummary => "The run summary split by run identifier.",
            FigureKind::ReadsLen1d => "Smoothed distribution of read lengths (log scale).",
            FigureKind::ReadsQual1d => "Smoothed distribution of mean read quality scores.",
            FigureKind::AlignLen1d => "Smoothed distribution of alignment lengths (log scale).",
            FigureKind::Identity1d => "Smoothed distribution of alignment identity frequencies.",
            FigureKind::ReadsLenQual2d => "Joint distribution of read length and read quality.",
            FigureKind::OutputOverTime => "Cumulative and interval output over experiment time.",
            FigureKind::LenOverTime => "Read length percentiles over experiment time.",
            FigureKind::QualOverTime => "Read quality percentiles over experiment time.",
            FigureKind::BarcodeCounts => "Number of reads per barcode.",
            FigureKind::ChannelsActivity => "Output per channel over experiment time.",
        }
    }

    /// The title used when the configuration does not provide one.
    pub fn default_title(&self) -> &'static str {
        match self {
            FigureKind::Summary => "Run summary",
            FigureKind::BarcodeSummary => "Run summary by barcode",
            FigureKind::RunIdSummary => "Run summary by Run ID",
            FigureKind::ReadsLen1d => "Distribution of read length",
            FigureKind::ReadsQual1d => "Distribution of read quality scores",
            FigureKind::AlignLen1d => "Distribution of alignment length",
            FigureKind::Identity1d => "Distribution of alignment identity",
            FigureKind::ReadsLenQual2d => "Mean read quality per sequence length",
            FigureKind::OutputOverTime => "Output over experiment time",
            FigureKind::LenOverTime => "Read length over experiment time",
            FigureKind::QualOverTime => "Read quality over experiment time",
            FigureKind::BarcodeCounts => "Percentage of reads per barcode",
            FigureKind::ChannelsActivity => "Output per channel over experiment time",
        }
    }

    /// The capability the figure needs, if any.
    pub fn requires(&self) -> Option<Capability> {
        match self {
            FigureKind::BarcodeSummary | FigureKind::BarcodeCounts => Some(Capability::Barcodes),
            FigureKind::AlignLen1d => Some(Capability::Alignment),
            FigureKind::Identity1d => Some(Capability::IdentityFreq),
            _ => None,
        }
    }

    /// Looks a kind up by its configuration name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|kind| kind.name() == name)
            .copied()
            .ok_or_else(|| Error::invalid(format!("unknown figure kind: {}", name)))
    }
}

impl fmt::Display for FigureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FigureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

//============//
// Parameters //
//============//

/// Parameters of the one dimensional distributions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionParams {
    /// Number of bin edges.
    pub nbins: usize,
    /// Sigma of the Gaussian smoothing.
    pub smooth_sigma: f64,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            nbins: 200,
            smooth_sigma: 2.0,
        }
    }
}

/// Parameters of the read length by quality distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointDistributionParams {
    /// Number of bin edges for read lengths (x axis).
    pub len_nbins: usize,
    /// Number of bin edges for read qualities (y axis).
    pub qual_nbins: usize,
    /// Sigma of the Gaussian smoothing.
    pub smooth_sigma: f64,
}

impl Default for JointDistributionParams {
    fn default() -> Self {
        Self {
            len_nbins: 200,
            qual_nbins: 75,
            smooth_sigma: 2.0,
        }
    }
}

/// Parameters of the series binned over time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesParams {
    /// Number of time bins.
    pub time_bins: usize,
    /// Sigma of the Gaussian smoothing.
    pub smooth_sigma: f64,
}

impl Default for TimeSeriesParams {
    fn default() -> Self {
        Self {
            time_bins: 500,
            smooth_sigma: 1.0,
        }
    }
}

/// Parameters of the channel activity matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelActivityParams {
    /// Number of time bins.
    pub time_bins: usize,
    /// Sigma of the Gaussian smoothing (time axis only).
    pub smooth_sigma: f64,
    /// Value every cell starts at. Set to 1 to reproduce older reports.
    pub baseline: f64,
}

impl Default for ChannelActivityParams {
    fn default() -> Self {
        Self {
            time_bins: 100,
            smooth_sigma: 1.0,
            baseline: 0.0,
        }
    }
}

/// The typed parameters of a figure.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FigureParams {
    /// Tables and counts take no parameters.
    None,
    /// See [`DistributionParams`].
    Distribution(DistributionParams),
    /// See [`JointDistributionParams`].
    JointDistribution(JointDistributionParams),
    /// See [`TimeSeriesParams`].
    TimeSeries(TimeSeriesParams),
    /// See [`ChannelActivityParams`].
    ChannelActivity(ChannelActivityParams),
}

impl FigureParams {
    /// The default parameters of a kind.
    pub fn default_for(kind: FigureKind) -> Self {
        // Parsing an empty object always succeeds and yields the defaults.
        Self::parse(kind, &Value::Null).unwrap_or(FigureParams::None)
    }

    /// Parses the parameters of a kind from a JSON value. `null` yields the
    /// defaults.
    pub fn parse(kind: FigureKind, value: &Value) -> Result<Self> {
        Ok(match kind {
            FigureKind::Summary
            | FigureKind::BarcodeSummary
            | FigureKind::RunIdSummary
            | FigureKind::BarcodeCounts => FigureParams::None,
            FigureKind::ReadsLen1d
            | FigureKind::ReadsQual1d
            | FigureKind::AlignLen1d
            | FigureKind::Identity1d => FigureParams::Distribution(from_value(kind, value)?),
            FigureKind::ReadsLenQual2d => FigureParams::JointDistribution(from_value(kind, value)?),
            FigureKind::OutputOverTime | FigureKind::LenOverTime | FigureKind::QualOverTime => {
                FigureParams::TimeSeries(from_value(kind, value)?)
            }
            FigureKind::ChannelsActivity => FigureParams::ChannelActivity(from_value(kind, value)?),
        })
    }
}

fn from_value<T>(kind: FigureKind, value: &Value) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match value {
        Value::Null => Ok(T::default()),
        v => T::deserialize(v).map_err(|e| {
            Error::invalid(format!("invalid parameters for {}: {}", kind.name(), e))
        }),
    }
}

//========//
// Config //
//========//

/// A single figure to produce.
#[derive(Clone, Debug, PartialEq)]
pub struct FigureRequest {
    /// The kind of figure.
    pub kind: FigureKind,
    /// Its title.
    pub title: String,
    /// Its parameters.
    pub params: FigureParams,
}

impl FigureRequest {
    /// A request for a kind with its default title and parameters.
    pub fn new(kind: FigureKind) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            params: FigureParams::default_for(kind),
        }
    }
}

/// An ordered list of figures to produce.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportConfig {
    requests: Vec<FigureRequest>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            requests: FigureKind::ALL.iter().map(|k| FigureRequest::new(*k)).collect(),
        }
    }
}

impl ReportConfig {
    /// Parses a configuration from JSON text.
    ///
    /// ```
    /// use lrqc::report::config::{FigureKind, FigureParams, ReportConfig};
    ///
    /// let config = ReportConfig::from_json(r#"{
    ///     "reads_qual_1D": { "nbins": 50, "color": "salmon" },
    ///     "summary": {}
    /// }"#).unwrap();
    ///
    /// let kinds = config.requests().iter().map(|r| r.kind).collect::<Vec<_>>();
    /// assert_eq!(kinds, [FigureKind::ReadsQual1d, FigureKind::Summary]);
    /// match &config.requests()[0].params {
    ///     FigureParams::Distribution(p) => assert_eq!((p.nbins, p.smooth_sigma), (50, 2.0)),
    ///     _ => unreachable!(),
    /// }
    ///
    /// assert!(ReportConfig::from_json(r#"{ "pie_chart": {} }"#).is_err());
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        let root: serde_json::Map<String, Value> = serde_json::from_str(text)
            .map_err(|e| Error::invalid(format!("invalid report configuration: {}", e)))?;

        let mut requests = Vec::new();
        for (name, value) in root {
            let kind = FigureKind::from_name(&name)?;

            let title = match value.get("plot_title") {
                Some(Value::String(title)) => title.clone(),
                _ => kind.default_title().to_string(),
            };

            let params = FigureParams::parse(kind, &value)?;
            requests.push(FigureRequest {
                kind,
                title,
                params,
            });
        }

        Ok(Self { requests })
    }

    /// Reads a configuration file. A file that is missing, unreadable, or not
    /// valid JSON falls back to the default configuration with a warning;
    /// unknown figure kinds and invalid parameters are errors.
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Could not read report configuration {}: {}. Using the default configuration.",
                    path.display(),
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = serde_json::from_str::<Value>(&text) {
            warn!(
                "Report configuration {} is not valid JSON: {}. Using the default configuration.",
                path.display(),
                e
            );
            return Ok(Self::default());
        }

        debug!("Read report configuration from {}.", path.display());
        Self::from_json(&text)
    }

    /// The requested figures, in order.
    pub fn requests(&self) -> &[FigureRequest] {
        &self.requests
    }

    /// Keeps only the requests for the given kind.
    pub fn only(mut self, kind: FigureKind) -> Self {
        self.requests.retain(|r| r.kind == kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_and_are_unique() {
        for kind in FigureKind::ALL {
            assert_eq!(FigureKind::from_name(kind.name()).unwrap(), kind);
        }

        assert!(matches!(
            "reads_length_1D".parse::<FigureKind>(),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_default_config_lists_every_kind() {
        let config = ReportConfig::default();
        assert_eq!(config.requests().len(), FigureKind::ALL.len());
        assert_eq!(config.requests()[3].title, "Distribution of read length");
        assert_eq!(
            config.requests()[12].params,
            FigureParams::ChannelActivity(ChannelActivityParams::default())
        );
    }

    #[test]
    fn test_parsing_keeps_order_and_fills_defaults() {
        let config = ReportConfig::from_json(
            r#"{
                "channels_activity": { "time_bins": 25, "plot_title": "Channels" },
                "output_over_time": null,
                "reads_len_qual_2D": { "colorscale": [[0.0, "white"]], "qual_nbins": 20 }
            }"#,
        )
        .unwrap();

        let requests = config.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].title, "Channels");
        assert_eq!(
            requests[0].params,
            FigureParams::ChannelActivity(ChannelActivityParams {
                time_bins: 25,
                ..Default::default()
            })
        );
        assert_eq!(
            requests[1].params,
            FigureParams::TimeSeries(TimeSeriesParams::default())
        );
        assert_eq!(
            requests[2].params,
            FigureParams::JointDistribution(JointDistributionParams {
                qual_nbins: 20,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_invalid_configurations() {
        assert!(matches!(
            ReportConfig::from_json(r#"{ "summary": {}, "sankey": {} }"#),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            ReportConfig::from_json(r#"{ "reads_len_1D": { "nbins": "many" } }"#),
            Err(Error::InvalidParameter(_))
        ));
        assert!(ReportConfig::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_unreadable_file_falls_back_to_default() {
        let config = ReportConfig::from_path("/nonexistent/lrqc/config.json").unwrap();
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn test_only() {
        let config = ReportConfig::default().only(FigureKind::BarcodeCounts);
        assert_eq!(config.requests().len(), 1);
        assert_eq!(config.requests()[0].kind, FigureKind::BarcodeCounts);
    }
}
