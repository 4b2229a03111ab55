//! Number formatting and progress reporting.

use std::fmt;

use num_format::Locale;
use num_format::ToFormattedString;
use tracing::info;

/// Formats an integer with thousands separators (e.g., `1,234,567`).
pub fn thousands(value: u64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// Formats a float with thousands separators and two decimals (e.g.,
/// `12,345.68`).
pub struct DecimalFormat(pub f64);

impl fmt::Display for DecimalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_finite() {
            return write!(f, "{}", self.0);
        }

        let rounded = format!("{:.2}", self.0.abs());
        let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
        let whole = whole.parse::<u64>().map(thousands).unwrap_or_else(|_| whole.to_string());

        let sign = if self.0 < 0.0 && rounded != "0.00" { "-" } else { "" };
        write!(f, "{}{}.{}", sign, whole, fraction)
    }
}

/// Counts the rows read from a file and periodically logs progress.
#[derive(Debug)]
pub struct RowCounter {
    rows: usize,
    log_every: usize,
}

impl RowCounter {
    /// Rows between two progress messages when none is given.
    pub const DEFAULT_LOG_EVERY: usize = 500_000;

    /// Creates a counter that logs every `log_every` rows (or every
    /// [`Self::DEFAULT_LOG_EVERY`] rows).
    pub fn new(log_every: Option<usize>) -> Self {
        RowCounter {
            rows: 0,
            log_every: log_every.unwrap_or(Self::DEFAULT_LOG_EVERY).max(1),
        }
    }

    /// The number of rows counted so far.
    pub fn get(&self) -> usize {
        self.rows
    }

    /// Counts one more row.
    pub fn inc(&mut self) {
        self.rows += 1;

        if self.rows % self.log_every == 0 {
            info!("  [*] Read {} rows.", thousands(self.rows as u64));
        }
    }
}
