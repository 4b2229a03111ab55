//! The JSON summary written by `lrqc qc`.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::stats::summary::LevelStats;

/// Main struct for the summary statistics of a run: one entry per
/// population level (`"All Reads"`, `"Pass Reads"`), in that order.
///
/// The serialized form is the mapping itself. New keys are only ever added,
/// so older summaries remain readable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Results {
    /// Statistics per population level.
    pub levels: IndexMap<String, LevelStats>,
}

impl Results {
    /// Wraps the statistics of every level.
    pub fn new(levels: IndexMap<String, LevelStats>) -> Self {
        Self { levels }
    }

    /// Attempts to write the [`Results`] struct to `<prefix>.summary.json`
    /// within the specified directory. Returns the path written to.
    pub fn write(&self, output_prefix: &str, directory: &Path) -> Result<PathBuf, io::Error> {
        let mut filepath = PathBuf::from(directory);
        filepath.push(format!("{}.summary.json", output_prefix));

        let mut file = File::create(&filepath)?;
        let output = serde_json::to_string_pretty(&self)?;
        file.write_all(output.as_bytes())?;

        Ok(filepath)
    }

    /// Attempts to read a [`Results`] struct from a file.
    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Results> {
        let path = filepath.as_ref();
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::summary::summary_stats;
    use crate::table::tests::fixture;
    use crate::table::{PassFilter, Views};

    #[test]
    fn test_write_and_read_back() {
        let table = fixture();
        let views = Views::new(&table, &PassFilter::default(), 100, 42).unwrap();
        let results = Results::new(summary_stats(&views, None, true, true).unwrap());

        let directory = std::env::temp_dir().join(format!("lrqc-results-{}", std::process::id()));
        fs::create_dir_all(&directory).unwrap();

        let path = results.write("run", &directory).unwrap();
        assert!(path.ends_with("run.summary.json"));

        let read = Results::read(&path).unwrap();
        let (general, expected) = (
            &read.levels["Pass Reads"].general_stats,
            &results.levels["Pass Reads"].general_stats,
        );
        assert_eq!(general.reads_number, expected.reads_number);
        assert_eq!(general.n50, expected.n50);
        assert_eq!(general.len_percentiles.len(), 101);
        assert_eq!(read.levels["All Reads"].barcode_stats.as_ref().unwrap().len(), 2);
        assert_eq!(read.levels.keys().collect::<Vec<_>>(), ["All Reads", "Pass Reads"]);

        fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn test_additive_keys_are_optional() {
        let json = r#"{
            "All Reads": {
                "general_stats": {
                    "reads_number": 1,
                    "bases_number": 10,
                    "N50": 10,
                    "median_read_len": 10.0,
                    "len_percentiles": [10.0],
                    "qual_score_percentiles": [],
                    "run_duration_hours": 0.0,
                    "active_channels": 1,
                    "runid_number": 1
                }
            }
        }"#;

        let results: Results = serde_json::from_str(json).unwrap();
        let general = &results.levels["All Reads"].general_stats;
        assert_eq!(general.n50, 10);
        assert_eq!(general.barcodes_number, None);
        assert!(results.levels["All Reads"].run_id_stats.is_none());
    }
}
