//! Dictionary-encoded categorical columns (run identifiers, barcodes, and
//! reference names).

use std::collections::HashMap;

use crate::errors::Error;
use crate::errors::Result;

/// Largest number of distinct values a column can hold.
pub const MAX_LEVELS: usize = u32::MAX as usize;

/// A categorical column: each distinct value (a "level") is stored once and
/// every row holds a small integer code pointing at its level. Rows may be
/// missing a value entirely (e.g., unaligned reads have no reference).
#[derive(Clone, Debug)]
pub struct Categorical {
    // Distinct values in first-encounter order.
    levels: Vec<String>,
    // Reverse lookup from value to level code.
    lookup: HashMap<String, u32>,
    // Per-row level codes.
    codes: Vec<Option<u32>>,
    max_levels: usize,
}

impl Default for Categorical {
    fn default() -> Self {
        Self::with_max_levels(MAX_LEVELS)
    }
}

impl Categorical {
    /// Creates an empty column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty column holding at most `max_levels` distinct values.
    pub fn with_max_levels(max_levels: usize) -> Self {
        Categorical {
            levels: Vec::new(),
            lookup: HashMap::new(),
            codes: Vec::new(),
            max_levels: max_levels.min(MAX_LEVELS),
        }
    }

    /// Checks that a value could be appended without changing the column.
    pub fn check(&self, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) if !self.lookup.contains_key(v) && self.levels.len() >= self.max_levels => {
                Err(Error::invalid(format!(
                    "too many distinct categorical values (at most {})",
                    self.max_levels
                )))
            }
            _ => Ok(()),
        }
    }

    /// Appends a value (or a missing value) to the column. The column is left
    /// untouched on error.
    pub fn push(&mut self, value: Option<&str>) -> Result<()> {
        self.check(value)?;

        let code = value.map(|v| self.intern(v));
        self.codes.push(code);
        Ok(())
    }

    // Only called once `check` has passed, so the code always fits.
    fn intern(&mut self, value: &str) -> u32 {
        if let Some(code) = self.lookup.get(value) {
            return *code;
        }

        let code = self.levels.len() as u32;
        self.levels.push(value.to_string());
        self.lookup.insert(value.to_string(), code);
        code
    }

    /// Gets the value for a row, if present.
    pub fn get(&self, row: usize) -> Option<&str> {
        self.code(row).map(|c| self.levels[c as usize].as_str())
    }

    /// Gets the level code for a row, if present.
    pub fn code(&self, row: usize) -> Option<u32> {
        self.codes.get(row).copied().flatten()
    }

    /// Gets the name of a level by its code.
    pub fn level(&self, code: u32) -> &str {
        self.levels[code as usize].as_str()
    }

    /// All distinct values in first-encounter order.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Number of rows in the column.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Counts the distinct non-missing values among the given rows.
    pub fn count_distinct(&self, rows: &[usize]) -> usize {
        let mut seen = vec![false; self.levels.len()];
        let mut distinct = 0;

        for code in rows.iter().filter_map(|row| self.code(*row)) {
            let slot = &mut seen[code as usize];
            if !*slot {
                *slot = true;
                distinct += 1;
            }
        }

        distinct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_keeps_first_encounter_order() {
        let mut column = Categorical::new();
        column.push(Some("run_b")).unwrap();
        column.push(Some("run_a")).unwrap();
        column.push(Some("run_b")).unwrap();
        column.push(None).unwrap();

        assert_eq!(column.len(), 4);
        assert_eq!(column.levels(), ["run_b", "run_a"]);
        assert_eq!(column.code(2), Some(0));
        assert_eq!(column.get(1), Some("run_a"));
        assert_eq!(column.get(3), None);
    }

    #[test]
    fn test_full_column_rejects_new_values_only() {
        let mut column = Categorical::with_max_levels(1);
        column.push(Some("bc01")).unwrap();

        assert!(matches!(column.push(Some("bc02")), Err(Error::InvalidParameter(_))));
        assert_eq!(column.len(), 1);
        assert_eq!(column.levels(), ["bc01"]);

        column.push(Some("bc01")).unwrap();
        column.push(None).unwrap();
        assert_eq!(column.len(), 3);
    }

    #[test]
    fn test_count_distinct() {
        let mut column = Categorical::new();
        for value in ["a", "b", "a", "c"] {
            column.push(Some(value)).unwrap();
        }

        assert_eq!(column.count_distinct(&[0, 1, 2, 3]), 3);
        assert_eq!(column.count_distinct(&[0, 2]), 1);
        assert_eq!(column.count_distinct(&[]), 0);
    }
}
