//! Read-only views over a [`ReadTable`] and the filter that derives the
//! "pass" view from the "all" view.

use serde::Serialize;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::sampling;
use crate::table::{Field, ReadTable};

//=======//
// Level //
//=======//

/// Which population of reads a view represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ViewLevel {
    /// Every read in the table.
    All,

    /// Only reads that meet the [`PassFilter`].
    Pass,
}

impl ViewLevel {
    /// Human readable label for the level.
    pub fn label(&self) -> &'static str {
        match self {
            ViewLevel::All => "All Reads",
            ViewLevel::Pass => "Pass Reads",
        }
    }
}

//========//
// Filter //
//========//

/// The predicate deciding whether a read is a "pass" read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassFilter {
    /// Minimum mean quality score (inclusive).
    pub min_qual: f64,

    /// Minimum read length (inclusive).
    pub min_len: u64,
}

impl Default for PassFilter {
    fn default() -> Self {
        PassFilter {
            min_qual: 7.0,
            min_len: 0,
        }
    }
}

impl PassFilter {
    /// Whether a row of the table passes. Reads with a missing quality score
    /// never pass.
    pub fn passes(&self, table: &ReadTable, row: usize) -> bool {
        match table.mean_qscore(row) {
            Some(q) => q >= self.min_qual && table.read_len(row) >= self.min_len,
            None => false,
        }
    }
}

//======//
// View //
//======//

/// A read-only projection of a [`ReadTable`]: a reference to the backing
/// table, a subset of its rows (in table order), and the factor that scales
/// counts computed on this view back to the population it was drawn from.
#[derive(Clone, Debug)]
pub struct View<'a> {
    table: &'a ReadTable,
    rows: Vec<usize>,
    level: ViewLevel,
    scaling_factor: f64,
}

impl<'a> View<'a> {
    /// A view over every row of the table.
    pub fn all(table: &'a ReadTable) -> Self {
        View {
            table,
            rows: (0..table.len()).collect(),
            level: ViewLevel::All,
            scaling_factor: 1.0,
        }
    }

    /// The pass view derived from `self` with the given filter.
    pub fn pass(&self, filter: &PassFilter) -> Self {
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|row| filter.passes(self.table, *row))
            .collect();

        View {
            table: self.table,
            rows,
            level: ViewLevel::Pass,
            scaling_factor: self.scaling_factor,
        }
    }

    /// A view over a subset of the rows of `self`, keeping level and scaling
    /// factor. Used for per-group views.
    pub fn subset(&self, rows: Vec<usize>) -> Self {
        View {
            table: self.table,
            rows,
            level: self.level,
            scaling_factor: self.scaling_factor,
        }
    }

    pub(crate) fn resampled(&self, rows: Vec<usize>, scaling_factor: f64) -> Self {
        View {
            table: self.table,
            rows,
            level: self.level,
            scaling_factor,
        }
    }

    /// The backing table.
    pub fn table(&self) -> &'a ReadTable {
        self.table
    }

    /// The rows of the backing table that are part of this view.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Number of reads in the view.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the view holds no reads.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The population level of the view.
    pub fn level(&self) -> ViewLevel {
        self.level
    }

    /// Multiplier converting counts on this view to population estimates.
    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    /// Fails unless the backing table provides the field.
    pub fn check_field(&self, field: Field) -> Result<()> {
        match field.requires() {
            Some(capability) => self.table.capabilities().require(capability),
            None => Ok(()),
        }
    }

    /// The non-missing values of a field, in row order.
    pub fn values(&self, field: Field) -> Result<Vec<f64>> {
        self.check_field(field)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| self.table.value(field, *row))
            .collect())
    }

    /// The non-missing values of an integer-valued field, in row order.
    pub fn counts(&self, field: Field) -> Result<Vec<u64>> {
        self.check_field(field)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| self.table.count(field, *row))
            .collect())
    }

    /// Sums an integer-valued field over the view, skipping missing values.
    pub fn sum(&self, field: Field) -> Result<u64> {
        Ok(self.counts(field)?.iter().sum())
    }

    /// Pairs of values for two fields, dropping rows where either is missing.
    pub fn pairs(&self, x: Field, y: Field) -> Result<Vec<(f64, f64)>> {
        self.check_field(x)?;
        self.check_field(y)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| Some((self.table.value(x, *row)?, self.table.value(y, *row)?)))
            .collect())
    }
}

//=======//
// Views //
//=======//

/// The four views every report is computed from: {all, pass} × {full,
/// sampled}. Built once and never updated.
#[derive(Clone, Debug)]
pub struct Views<'a> {
    /// Every read.
    pub all: View<'a>,

    /// Every pass read.
    pub pass: View<'a>,

    /// Deterministic sample of `all`.
    pub all_sample: View<'a>,

    /// Deterministic sample of `pass`.
    pub pass_sample: View<'a>,
}

impl<'a> Views<'a> {
    /// Derives the pass view and draws both samples.
    pub fn new(
        table: &'a ReadTable,
        filter: &PassFilter,
        sample_size: usize,
        seed: u64,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::insufficient("the read table is empty"));
        }

        let all = View::all(table);
        let pass = all.pass(filter);
        let all_sample = sampling::sample(&all, sample_size, seed)?;
        let pass_sample = sampling::sample(&pass, sample_size, seed)?;

        debug!(
            "Views: {} reads ({} sampled, x{:.2}), {} pass reads ({} sampled, x{:.2}).",
            all.len(),
            all_sample.len(),
            all_sample.scaling_factor(),
            pass.len(),
            pass_sample.len(),
            pass_sample.scaling_factor()
        );

        Ok(Views {
            all,
            pass,
            all_sample,
            pass_sample,
        })
    }

    /// The exact (unsampled) view for a level.
    pub fn full(&self, level: ViewLevel) -> &View<'a> {
        match level {
            ViewLevel::All => &self.all,
            ViewLevel::Pass => &self.pass,
        }
    }

    /// The sampled view for a level.
    pub fn sampled(&self, level: ViewLevel) -> &View<'a> {
        match level {
            ViewLevel::All => &self.all_sample,
            ViewLevel::Pass => &self.pass_sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Capability;
    use crate::table::tests::fixture;

    #[test]
    fn test_pass_filter_on_quality_and_length() {
        let table = fixture();
        let all = View::all(&table);

        let pass = all.pass(&PassFilter::default());
        assert_eq!(pass.rows(), [0, 2, 3, 4]);
        assert_eq!(pass.level(), ViewLevel::Pass);

        let pass = all.pass(&PassFilter {
            min_qual: 7.0,
            min_len: 250,
        });
        assert_eq!(pass.rows(), [2, 4]);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let mut builder = ReadTable::builder(Default::default());
        builder
            .push(crate::table::ReadRecord::new("run", 1, 0.0, 10, f64::NAN))
            .unwrap();
        builder
            .push(crate::table::ReadRecord::new("run", 1, 0.0, 20, 8.0))
            .unwrap();
        let table = builder.build();
        let all = View::all(&table);

        assert_eq!(all.len(), 2);
        assert_eq!(all.values(Field::MeanQscore).unwrap(), [8.0]);
        assert_eq!(all.sum(Field::ReadLen).unwrap(), 30);
        assert_eq!(all.pass(&PassFilter::default()).rows(), [1]);
    }

    #[test]
    fn test_gated_fields() {
        let table = fixture();
        let all = View::all(&table);
        assert_eq!(
            all.values(Field::AlignLen),
            Err(Error::CapabilityUnavailable(Capability::Alignment))
        );
    }

    #[test]
    fn test_views_without_downsampling() {
        let table = fixture();
        let views = Views::new(&table, &PassFilter::default(), 100, 42).unwrap();
        assert_eq!(views.all_sample.rows(), views.all.rows());
        assert_eq!(views.pass_sample.scaling_factor(), 1.0);
        assert_eq!(views.full(ViewLevel::Pass).len(), 4);
    }
}
