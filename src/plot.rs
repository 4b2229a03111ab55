//! Rendering computed figures as standalone plotly HTML files.
//!
//! Every panel of a figure becomes its own plot. Styling is kept to titles
//! and axis labels; tables are printed by the command line rather than
//! rendered here.

use std::path::Path;
use std::path::PathBuf;

use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;
use plotly::layout::AxisType;
use plotly::Bar;
use plotly::Contour;
use plotly::HeatMap;
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use tracing::debug;

use crate::density::{Density1d, Density2d};
use crate::report::{Figure, FigureKind, Panel, Series};
use crate::temporal::{ChannelActivity, OutputOverTime, TimeTrend};

/// A rendered panel along with the slug used to name its file.
pub struct RenderedPanel {
    /// File-safe name of the panel (e.g., `pass_reads`).
    pub slug: String,

    /// The plot itself.
    pub plot: Plot,
}

/// Converts a panel label into a file-safe slug.
///
/// ```
/// assert_eq!(lrqc::plot::slug("Pass Reads"), "pass_reads");
/// ```
pub fn slug(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Renders every panel of a figure. Table figures yield no plots.
pub fn render(figure: &Figure) -> Vec<RenderedPanel> {
    figure
        .panels
        .iter()
        .filter_map(|panel| {
            render_panel(figure, panel).map(|plot| RenderedPanel {
                slug: slug(&panel.label),
                plot,
            })
        })
        .collect()
}

/// Writes every rendered panel of a figure to
/// `<prefix>.<kind>.<panel>.html` within `directory`, returning the paths
/// written to.
pub fn write(figure: &Figure, prefix: &str, directory: &Path) -> Vec<PathBuf> {
    render(figure)
        .into_iter()
        .map(|rendered| {
            let mut filepath = PathBuf::from(directory);
            filepath.push(format!(
                "{}.{}.{}.html",
                prefix,
                figure.kind.name(),
                rendered.slug
            ));

            debug!("Writing {}.", filepath.display());
            rendered.plot.write_html(&filepath);
            filepath
        })
        .collect()
}

fn render_panel(figure: &Figure, panel: &Panel) -> Option<Plot> {
    let mut plot = Plot::new();
    let title = format!("{} ({})", figure.title, panel.label);

    let layout = match &panel.series {
        Series::Table(_) => return None,
        Series::Density1d(density) => density_1d(&mut plot, figure.kind, density),
        Series::Density2d(density) => density_2d(&mut plot, density),
        Series::Output(output) => output_over_time(&mut plot, output),
        Series::Trend(trend) => time_trend(&mut plot, figure.kind, trend),
        Series::Counts(counts) => barcode_counts(&mut plot, counts),
        Series::ChannelActivity(activity) => channel_activity(&mut plot, activity),
    };

    plot.set_layout(layout.title(Title::new(&title)));
    Some(plot)
}

fn axis(title: &str) -> Axis {
    Axis::new().title(Title::new(title))
}

//===========//
// Densities //
//===========//

fn density_1d(plot: &mut Plot, kind: FigureKind, density: &Density1d) -> Layout {
    let (x_title, log) = match kind {
        FigureKind::ReadsLen1d => ("Read length (bp)", true),
        FigureKind::AlignLen1d => ("Alignment length (bp)", true),
        FigureKind::Identity1d => ("Identity (%)", false),
        _ => ("Read quality score", false),
    };

    // (1) The density itself.
    plot.add_trace(
        Scatter::new(density.x.clone(), density.counts.clone())
            .mode(Mode::Lines)
            .name("Density"),
    );

    // (2) One vertical line per percentile marker.
    for marker in &density.markers {
        plot.add_trace(
            Scatter::new(vec![marker.value, marker.value], vec![0.0, density.y_max])
                .mode(Mode::Lines)
                .name(format!("{}: {:.2}", marker.label, marker.value).as_str()),
        );
    }

    let mut x_axis = axis(x_title);
    if log {
        x_axis = x_axis.type_(AxisType::Log);
    }

    Layout::new().x_axis(x_axis).y_axis(axis("Read density"))
}

fn density_2d(plot: &mut Plot, density: &Density2d) -> Layout {
    plot.add_trace(Contour::new(
        density.x_edges[1..].to_vec(),
        density.y_edges[1..].to_vec(),
        density.z.clone(),
    ));

    plot.add_trace(
        Scatter::new(vec![density.x_median], vec![density.y_median])
            .mode(Mode::Markers)
            .name(format!("Median: {:.0} bp, Q{:.2}", density.x_median, density.y_median).as_str()),
    );

    Layout::new()
        .x_axis(axis("Read length (bp)").type_(AxisType::Log))
        .y_axis(axis("Read quality score"))
}

//==========//
// Temporal //
//==========//

fn output_over_time(plot: &mut Plot, output: &OutputOverTime) -> Layout {
    plot.add_trace(
        Scatter::new(output.x.clone(), output.cumulative.clone())
            .mode(Mode::Lines)
            .name("Cumulative"),
    );
    plot.add_trace(
        Scatter::new(output.x.clone(), output.interval.clone())
            .mode(Mode::Lines)
            .name("Interval"),
    );

    for marker in &output.markers {
        plot.add_trace(
            Scatter::new(vec![marker.time], vec![marker.value])
                .mode(Mode::Markers)
                .name(format!("{}%: {:.2} h", marker.percent, marker.time).as_str()),
        );
    }

    Layout::new()
        .x_axis(axis("Experiment time (h)"))
        .y_axis(axis(&format!("Number of {}", output.level.to_string().to_lowercase())))
}

fn time_trend(plot: &mut Plot, kind: FigureKind, trend: &TimeTrend) -> Layout {
    let y_title = match kind {
        FigureKind::LenOverTime => "Read length (bp)",
        _ => "Read quality score",
    };

    let series = [
        ("Min", &trend.min),
        ("25%", &trend.q25),
        ("Median", &trend.median),
        ("75%", &trend.q75),
        ("Max", &trend.max),
    ];

    for (name, values) in series {
        plot.add_trace(
            Scatter::new(trend.x.clone(), values.clone())
                .mode(Mode::Lines)
                .name(name),
        );
    }

    Layout::new()
        .x_axis(axis("Experiment time (h)"))
        .y_axis(axis(y_title))
}

fn channel_activity(plot: &mut Plot, activity: &ChannelActivity) -> Layout {
    let channels = (1..=activity.n_channels).collect::<Vec<_>>();
    plot.add_trace(HeatMap::new(
        channels,
        activity.time_edges.clone(),
        activity.matrix.clone(),
    ));

    Layout::new()
        .x_axis(axis("Channel"))
        .y_axis(axis("Experiment time (h)"))
}

//==========//
// Barcodes //
//==========//

fn barcode_counts(plot: &mut Plot, counts: &[(String, usize)]) -> Layout {
    let total = counts.iter().map(|(_, n)| *n).sum::<usize>().max(1);
    let (barcodes, percents): (Vec<String>, Vec<f64>) = counts
        .iter()
        .map(|(barcode, n)| (barcode.clone(), *n as f64 / total as f64 * 100.0))
        .unzip();

    plot.add_trace(Bar::new(barcodes, percents).name("Reads"));

    Layout::new()
        .x_axis(axis("Barcode"))
        .y_axis(axis("Reads (%)"))
}
