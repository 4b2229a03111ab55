//! Grouping of views by run identifier or barcode.

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::Result;
use crate::table::View;

/// The categorical column reads can be grouped by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Group by sequencing run.
    RunId,

    /// Group by demultiplexing barcode.
    Barcode,
}

impl GroupBy {
    /// The column header used for the group key in tables.
    pub fn label(&self) -> &'static str {
        match self {
            GroupBy::RunId => "Run_id",
            GroupBy::Barcode => "Barcode",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::RunId => write!(f, "run_id"),
            GroupBy::Barcode => write!(f, "barcode"),
        }
    }
}

/// Partitions the rows of a view by group key. Keys are returned in
/// lexicographic order and rows keep their view order. Rows without a key
/// are left out.
///
/// Grouping by [`GroupBy::Barcode`] fails with
/// [`Error::CapabilityUnavailable`](crate::Error::CapabilityUnavailable) when
/// the table has no barcode column.
pub fn group_rows(view: &View<'_>, by: GroupBy) -> Result<IndexMap<String, Vec<usize>>> {
    let table = view.table();
    let column = match by {
        GroupBy::RunId => table.run_ids(),
        GroupBy::Barcode => table.barcodes()?,
    };

    // (1) Bucket rows by level code, which avoids hashing strings per row.
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); column.levels().len()];
    for row in view.rows() {
        if let Some(code) = column.code(*row) {
            buckets[code as usize].push(*row);
        }
    }

    // (2) Name the non-empty buckets and order them by key.
    Ok(buckets
        .into_iter()
        .enumerate()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(code, rows)| (column.level(code as u32).to_string(), rows))
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .collect())
}

/// Counts the reads of a view per barcode, in lexicographic barcode order.
pub fn barcode_counts(view: &View<'_>) -> Result<Vec<(String, usize)>> {
    Ok(group_rows(view, GroupBy::Barcode)?
        .into_iter()
        .map(|(barcode, rows)| (barcode, rows.len()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Capability, Error};
    use crate::table::tests::fixture;
    use crate::table::{PassFilter, ReadRecord, ReadTable, Schema};

    #[test]
    fn test_group_by_run_id_is_lexicographic() {
        let table = fixture();
        let all = View::all(&table);
        let groups = group_rows(&all, GroupBy::RunId).unwrap();

        // "run_b" is encountered first but sorts last.
        assert_eq!(groups.keys().collect_vec(), ["run_a", "run_b"]);
        assert_eq!(groups["run_a"], [2, 3]);
        assert_eq!(groups["run_b"], [0, 1, 4]);
    }

    #[test]
    fn test_group_by_barcode_on_pass_view() {
        let table = fixture();
        let pass = View::all(&table).pass(&PassFilter::default());
        let groups = group_rows(&pass, GroupBy::Barcode).unwrap();

        assert_eq!(groups.keys().collect_vec(), ["barcode01", "barcode02"]);
        assert_eq!(groups["barcode01"], [2, 4]);
        assert_eq!(
            barcode_counts(&pass).unwrap(),
            [("barcode01".to_string(), 2), ("barcode02".to_string(), 2)]
        );
    }

    #[test]
    fn test_group_by_barcode_without_barcodes() {
        let mut builder = ReadTable::builder(Schema::default());
        builder.push(ReadRecord::new("run", 1, 0.0, 10, 9.0)).unwrap();
        let table = builder.build();
        let all = View::all(&table);

        assert_eq!(
            group_rows(&all, GroupBy::Barcode),
            Err(Error::CapabilityUnavailable(Capability::Barcodes))
        );
        assert!(barcode_counts(&all).is_err());
    }
}
