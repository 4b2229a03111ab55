//! Functionality related to the `lrqc sample` command.

use std::path::PathBuf;

use clap::Args;
use tracing::debug;
use tracing::info;

use crate::formats::summary;
use crate::sampling::{sample_table, DEFAULT_SEED};

/// Clap arguments for the `lrqc sample` subcommand.
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Source sequencing summary file (optionally gzipped).
    #[arg(value_name = "SUMMARY")]
    src: PathBuf,

    /// Destination file. Gzipped if it ends in `.gz`.
    #[arg(value_name = "OUT")]
    dst: PathBuf,

    /// Number of reads to keep, split across runs proportionally to their
    /// size.
    #[arg(short = 'n', long, value_name = "USIZE", default_value_t = 10_000)]
    num_reads: usize,

    /// Seed of the sampling.
    #[arg(long, value_name = "U64", default_value_t = DEFAULT_SEED)]
    seed: u64,
}

/// Main method for the `lrqc sample` subcommand.
pub fn sample(args: SampleArgs) -> anyhow::Result<()> {
    info!("Starting sample command...");
    debug!("  [*] Source: {}", args.src.display());
    debug!("  [*] Destination: {}", args.dst.display());
    debug!("  [*] Reads: {}, seed: {}", args.num_reads, args.seed);

    let table = summary::read(&args.src, None)?;
    let sampled = sample_table(&table, args.num_reads, args.seed)?;
    summary::write(&sampled, &args.dst)?;

    Ok(())
}
