//! Functionality related to the `lrqc qc` command.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use tracing::debug;
use tracing::info;

use crate::formats::summary;
use crate::plot;
use crate::report::{FigureKind, FigureRequest, ReportConfig, Series, Session};
use crate::sampling::{DEFAULT_SAMPLE_SIZE, DEFAULT_SEED};
use crate::stats::summary::SummaryTable;
use crate::table::PassFilter;

//========================//
// Command line arguments //
//========================//

/// Clap arguments for the `lrqc qc` subcommand.
#[derive(Args, Debug)]
pub struct QcArgs {
    /// Source sequencing summary file (optionally gzipped).
    #[arg(value_name = "SUMMARY")]
    src: PathBuf,

    /// Directory to output files to. Defaults to current working directory.
    #[arg(short = 'o', long, value_name = "PATH")]
    output_directory: Option<PathBuf>,

    /// Output prefix for the files that will be created. Defaults to the name
    /// of the file without its extensions.
    #[arg(short = 'p', long, value_name = "STRING")]
    output_prefix: Option<String>,

    /// Minimum mean quality score of a pass read.
    #[arg(long, value_name = "F64", default_value_t = 7.0)]
    min_pass_qual: f64,

    /// Minimum length of a pass read.
    #[arg(long, value_name = "U64", default_value_t = 0)]
    min_pass_len: u64,

    /// Number of reads sampled for densities and time series.
    #[arg(long = "sample", value_name = "USIZE", default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Seed of the sampling.
    #[arg(long, value_name = "U64", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Reference lengths (`name<TAB>length` lines), used for the mean
    /// coverage.
    #[arg(short = 'r', long, value_name = "PATH")]
    references: Option<PathBuf>,

    /// Report configuration (JSON) listing the figures to produce.
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Writes one HTML plot per figure panel.
    #[arg(long)]
    plots: bool,

    /// Only produce one figure (specify the name of the figure).
    #[arg(long = "only", value_name = "FIGURE")]
    only_figure: Option<FigureKind>,
}

//==============================//
// Prepares the `qc` subcommand //
//==============================//

/// Prepares the arguments for running the main `qc` subcommand.
pub fn qc(args: QcArgs) -> anyhow::Result<()> {
    info!("Starting qc command...");
    debug!("Arguments:");

    let src = args.src;
    debug!("  [*] Source: {}", src.display());

    // Default is the name of the file, up to its first dot.
    let output_prefix = match args.output_prefix {
        Some(prefix) => prefix,
        None => default_prefix(&src)?,
    };
    debug!("  [*] Output prefix: {}", output_prefix);

    let output_directory = match args.output_directory {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    debug!("  [*] Output directory: {}", output_directory.display());

    let filter = PassFilter {
        min_qual: args.min_pass_qual,
        min_len: args.min_pass_len,
    };
    debug!("  [*] Pass filter: {:?}", filter);
    debug!("  [*] Sample size: {}, seed: {}", args.sample_size, args.seed);

    let mut config = match args.config {
        Some(path) => ReportConfig::from_path(path)?,
        None => ReportConfig::default(),
    };

    if let Some(kind) = args.only_figure {
        debug!("  [*] Only figure: {}", kind);
        config = config.only(kind);
    }

    app(
        src,
        args.references,
        output_prefix,
        output_directory,
        filter,
        args.sample_size,
        args.seed,
        config,
        args.plots,
    )
}

fn default_prefix(src: &Path) -> anyhow::Result<String> {
    let name = src
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Could not derive an output prefix from {}", src.display()))?;

    Ok(name.split('.').next().unwrap_or(name).to_string())
}

//==============//
// Main program //
//==============//

/// Runs the main program for the `qc` subcommand.
#[allow(clippy::too_many_arguments)]
fn app(
    src: PathBuf,
    references: Option<PathBuf>,
    output_prefix: String,
    output_directory: PathBuf,
    filter: PassFilter,
    sample_size: usize,
    seed: u64,
    config: ReportConfig,
    plots: bool,
) -> anyhow::Result<()> {
    if !output_directory.exists() {
        std::fs::create_dir_all(&output_directory).with_context(|| {
            format!("Could not create output directory {}", output_directory.display())
        })?;
    }

    // (1) Load the run.
    let table = summary::read(&src, None)?;
    let capabilities = table.capabilities();
    info!(
        "  [*] Barcodes: {}, alignments: {}, channels: {}",
        capabilities.has_barcodes,
        capabilities.has_alignment,
        capabilities.n_channels()
    );

    let mut session = Session::new(&table, &filter, sample_size, seed)?;
    if let Some(path) = references {
        session = session.with_references(summary::read_references(path)?);
    }

    // (2) Summary statistics.
    info!("Computing summary statistics.");
    let results = session.results()?;
    let filepath = results.write(&output_prefix, &output_directory)?;
    info!("  [*] Wrote {}.", filepath.display());

    let overall = session.figure(&FigureRequest::new(FigureKind::Summary))?;
    for panel in &overall.panels {
        if let Series::Table(table) = &panel.series {
            print_table(&panel.label, table);
        }
    }

    // (3) Figures.
    if !plots {
        return Ok(());
    }

    info!("Computing figures.");
    for figure in session.figures(&config) {
        if figure.kind == FigureKind::Summary {
            continue;
        }

        for panel in &figure.panels {
            if let Series::Table(table) = &panel.series {
                print_table(&format!("{} ({})", figure.title, panel.label), table);
            }
        }

        for path in plot::write(&figure, &output_prefix, &output_directory) {
            info!("  [*] Wrote {}.", path.display());
        }
    }

    Ok(())
}

/// Prints a summary table to stdout.
fn print_table(title: &str, summary: &SummaryTable) {
    let mut table = Table::new();

    table.set_titles(Row::new(vec![Cell::new(title)]));
    table.add_row(Row::new(summary.header.iter().map(|h| Cell::new(h)).collect()));
    for row in &summary.rows {
        table.add_row(Row::new(row.iter().map(|v| Cell::new(v)).collect()));
    }

    table.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix_strips_every_extension() {
        let prefix = default_prefix(Path::new("/data/sequencing_summary.txt.gz")).unwrap();
        assert_eq!(prefix, "sequencing_summary");
        assert_eq!(default_prefix(Path::new("run")).unwrap(), "run");
    }
}
