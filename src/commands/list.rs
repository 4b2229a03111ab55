//! Functionality related to the `lrqc list` command.

use clap::Args;
use prettytable::{row, Table};

use crate::report::FigureKind;

/// Command line arguments for `lrqc list`.
#[derive(Args, Debug)]
pub struct ListArgs {}

/// Main method for the `lrqc list` subcommand: prints every figure that can
/// be requested in a report configuration.
pub fn list(_: ListArgs) -> anyhow::Result<()> {
    let mut table = Table::new();

    table.add_row(row!["Name", "Requires", "Description"]);
    for kind in FigureKind::ALL {
        let requires = kind
            .requires()
            .map(|capability| capability.to_string())
            .unwrap_or_else(|| String::from("-"));

        table.add_row(row![kind.name(), requires, kind.description()]);
    }

    table.printstd();

    Ok(())
}
