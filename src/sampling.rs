//! Deterministic subsampling of views and tables.
//!
//! Density and temporal computations run on a fixed-size uniform sample of
//! each view so that their cost is bounded regardless of the size of the
//! run. The draw is seeded explicitly: identical input and seed always yield
//! identical rows. Exact aggregate statistics never use these samples.
//!
//! A second, stratified sampler ([`sample_table`]) produces a reduced table
//! for export, allocating rows to each run proportionally to its size.

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::table::{ReadTable, View};

/// The seed used when none is provided.
pub const DEFAULT_SEED: u64 = 42;

/// The number of reads kept in sampled views when none is provided.
pub const DEFAULT_SAMPLE_SIZE: usize = 100_000;

/// Draws `target_size` rows of `view` uniformly without replacement.
///
/// If the view has no more than `target_size` rows it is returned unchanged
/// with a scaling factor of one. Otherwise the scaling factor of the returned
/// view is `view.len() / target_size`. The selected rows keep their table
/// order.
///
/// ```
/// use lrqc::sampling::sample;
/// use lrqc::table::{ReadRecord, ReadTable, Schema, View};
///
/// let mut builder = ReadTable::builder(Schema::default());
/// for i in 0..10 {
///     builder.push(ReadRecord::new("run", 1, i as f64, 100, 10.0)).unwrap();
/// }
/// let table = builder.build();
///
/// let sampled = sample(&View::all(&table), 4, 42).unwrap();
/// assert_eq!(sampled.len(), 4);
/// assert_eq!(sampled.scaling_factor(), 2.5);
/// ```
pub fn sample<'a>(view: &View<'a>, target_size: usize, seed: u64) -> Result<View<'a>> {
    if target_size == 0 {
        return Err(Error::invalid("sample size must be greater than zero"));
    }

    if view.len() <= target_size {
        return Ok(view.resampled(view.rows().to_vec(), 1.0));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let rows = index::sample(&mut rng, view.len(), target_size)
        .into_iter()
        .map(|i| view.rows()[i])
        .sorted()
        .collect_vec();

    let scaling_factor = view.len() as f64 / target_size as f64;
    debug!(
        "Sampled {} of {} {} (scaling factor {:.3}).",
        target_size,
        view.len(),
        view.level().label().to_lowercase(),
        scaling_factor
    );

    Ok(view.resampled(rows, scaling_factor))
}

/// Computes how many rows each group receives when `n_seq` rows are split
/// proportionally across groups of the given sizes.
///
/// Each non-empty group receives `round(size / total * n_seq)` rows (ties
/// round to even), at least one and at most its own size. Because of the
/// minimum of one, the allocations may sum to slightly more than `n_seq`.
pub fn allocate(group_sizes: &[usize], n_seq: usize) -> Vec<usize> {
    let total: usize = group_sizes.iter().sum();

    group_sizes
        .iter()
        .map(|size| {
            if *size == 0 {
                return 0;
            }

            let share = (*size as f64 / total as f64 * n_seq as f64).round_ties_even() as usize;
            share.clamp(1, *size)
        })
        .collect()
}

/// Produces a reduced table of roughly `n_seq` reads, stratified by run.
///
/// Runs are visited in first-encounter order, each run is sampled according
/// to [`allocate`], and the concatenated result is sorted by start time.
pub fn sample_table(table: &ReadTable, n_seq: usize, seed: u64) -> Result<ReadTable> {
    if n_seq == 0 {
        return Err(Error::invalid("number of reads to sample must be greater than zero"));
    }

    if table.is_empty() {
        return Err(Error::insufficient("cannot sample from an empty read table"));
    }

    // (1) Partition rows by run, in first-encounter order (level codes are
    // assigned in that order).
    let run_ids = table.run_ids();
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); run_ids.levels().len()];
    for row in 0..table.len() {
        if let Some(code) = run_ids.code(row) {
            groups[code as usize].push(row);
        }
    }

    // (2) Sample each run independently from a single seeded generator.
    let sizes = groups.iter().map(Vec::len).collect_vec();
    let allocations = allocate(&sizes, n_seq);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();

    for ((group, n), level) in groups.iter().zip(allocations).zip(run_ids.levels()) {
        debug!("{} = {} reads, to sample = {}", level, group.len(), n);
        rows.extend(index::sample(&mut rng, group.len(), n).into_iter().map(|i| group[i]));
    }

    // (3) Order the reduced table by start time (stable, so ties keep their
    // group order).
    rows.sort_by(|a, b| table.start_time(*a).total_cmp(&table.start_time(*b)));

    table.take(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ReadRecord, Schema};

    fn table_of(sizes: &[(&str, usize)]) -> ReadTable {
        let mut builder = ReadTable::builder(Schema::default());
        let mut t = 0.0;
        for (run, size) in sizes {
            for i in 0..*size {
                builder
                    .push(ReadRecord::new(*run, 1, t, i as u64, 10.0))
                    .unwrap();
                t += 1.0;
            }
        }
        builder.build()
    }

    #[test]
    fn test_sample_is_deterministic() {
        let table = table_of(&[("run", 1000)]);
        let view = View::all(&table);

        let a = sample(&view, 100, DEFAULT_SEED).unwrap();
        let b = sample(&view, 100, DEFAULT_SEED).unwrap();
        assert_eq!(a.rows(), b.rows());
        assert_eq!(a.len(), 100);
        assert_eq!(a.scaling_factor(), 10.0);
        assert!(a.rows().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_smaller_than_target() {
        let table = table_of(&[("run", 10)]);
        let view = View::all(&table);

        let sampled = sample(&view, 10, DEFAULT_SEED).unwrap();
        assert_eq!(sampled.rows(), view.rows());
        assert_eq!(sampled.scaling_factor(), 1.0);
        assert!(sample(&view, 0, DEFAULT_SEED).is_err());
    }

    #[test]
    fn test_allocation_forces_minimum_of_one() {
        assert_eq!(allocate(&[99_999, 1], 10_000), [10_000, 1]);
        assert_eq!(allocate(&[50, 50], 10), [5, 5]);
        assert_eq!(allocate(&[3, 0], 10), [3, 0]);
        // 2.5 rounds to even.
        assert_eq!(allocate(&[1, 1, 2], 5), [1, 1, 2]);
    }

    #[test]
    fn test_stratified_sample_table() {
        let table = table_of(&[("run_a", 90), ("run_b", 9), ("run_c", 1)]);
        let reduced = sample_table(&table, 10, DEFAULT_SEED).unwrap();

        // run_a: 9, run_b: round(0.9) = 1, run_c: round(0.1) = 0 -> 1.
        assert_eq!(reduced.len(), 11);
        let view = View::all(&reduced);
        let times = view.values(crate::table::Field::StartTime).unwrap();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reduced.run_ids().count_distinct(view.rows()), 3);

        let again = sample_table(&table, 10, DEFAULT_SEED).unwrap();
        assert_eq!(
            (0..again.len()).map(|r| again.record(r)).collect_vec(),
            (0..reduced.len()).map(|r| reduced.record(r)).collect_vec()
        );
    }

    #[test]
    fn test_stratified_sample_table_errors() {
        let empty = table_of(&[]);
        assert!(matches!(
            sample_table(&empty, 10, DEFAULT_SEED),
            Err(Error::InsufficientData(_))
        ));

        let table = table_of(&[("run", 5)]);
        assert!(matches!(
            sample_table(&table, 0, DEFAULT_SEED),
            Err(Error::InvalidParameter(_))
        ));
    }
}
