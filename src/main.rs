use clap::{Parser, Subcommand};
use git_testament::{git_testament, render_testament};

use lrqc::commands;
use lrqc::commands::list::ListArgs;
use lrqc::commands::qc::QcArgs;
use lrqc::commands::sample::SampleArgs;

git_testament!(TESTAMENT);

#[derive(Parser)]
#[command(name = "lrqc", about = "Quality control of long-read sequencing runs.")]
struct Cli {
    #[command(subcommand)]
    subcommand: Subcommands,

    /// Only errors are printed to the stderr stream.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// All available information, including debug information, is printed
    /// to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Subcommands {
    /// Lists the figures that can be requested in a report configuration.
    List(ListArgs),

    /// Computes summary statistics and figures for a sequencing summary.
    Qc(QcArgs),

    /// Writes a reduced sequencing summary, sampled proportionally per run.
    Sample(SampleArgs),
}

fn main() -> anyhow::Result<()> {
    let version = render_testament!(TESTAMENT);
    let cli = Cli::parse_from_version(version);

    let mut level = tracing::Level::INFO;
    if cli.quiet {
        level = tracing::Level::ERROR;
    } else if cli.verbose {
        level = tracing::Level::DEBUG;
    }

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.subcommand {
        Subcommands::List(args) => commands::list(args),
        Subcommands::Qc(args) => commands::qc(args),
        Subcommands::Sample(args) => commands::sample(args),
    }
}

impl Cli {
    fn parse_from_version(version: String) -> Self {
        use clap::{CommandFactory, FromArgMatches};

        let matches = Cli::command()
            .version(version)
            .propagate_version(true)
            .get_matches();

        match Cli::from_arg_matches(&matches) {
            Ok(cli) => cli,
            Err(e) => e.exit(),
        }
    }
}
