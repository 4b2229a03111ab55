//! Sequencing summary files: the tab-separated, one-row-per-read tables
//! written by basecallers (optionally merged with alignment statistics).
//!
//! Several basecaller generations name the same column differently, so every
//! column is recognized by a list of aliases. Which optional column groups a
//! file carries (barcodes, alignment statistics, identity frequencies) is
//! inferred from its header unless a [`Schema`] is forced by the caller.

use std::io::Read;
use std::io::Write;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use csv::StringRecord;
use indexmap::IndexMap;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::formats;
use crate::table::{Alignment, ReadRecord, ReadTable, Schema};
use crate::utils::display::thousands;
use crate::utils::display::RowCounter;

/// Value written for the reference of an unaligned read.
pub const UNALIGNED: &str = "*";

//=========//
// Columns //
//=========//

/// A column recognized in a sequencing summary file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    /// Run identifier.
    RunId,
    /// Channel number.
    Channel,
    /// Start time in seconds.
    StartTime,
    /// Read length.
    ReadLen,
    /// Mean quality score.
    MeanQscore,
    /// Demultiplexing barcode.
    Barcode,
    /// Reference sequence name.
    RefId,
    /// Alignment start.
    RefStart,
    /// Alignment end.
    RefEnd,
    /// Alignment length.
    AlignLen,
    /// Inserted bases.
    Insertion,
    /// Deleted bases.
    Deletion,
    /// Mismatched bases.
    Mismatch,
    /// Soft clipped bases.
    SoftClip,
    /// Identity frequency.
    IdentityFreq,
}

impl Column {
    /// Every column, in the order they are written.
    pub const ALL: [Column; 15] = [
        Column::RunId,
        Column::Channel,
        Column::StartTime,
        Column::ReadLen,
        Column::MeanQscore,
        Column::Barcode,
        Column::RefId,
        Column::RefStart,
        Column::RefEnd,
        Column::AlignLen,
        Column::Insertion,
        Column::Deletion,
        Column::Mismatch,
        Column::SoftClip,
        Column::IdentityFreq,
    ];

    /// Header names accepted for the column. The first one is used when
    /// writing.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::RunId => &["run_id"],
            Column::Channel => &["channel"],
            Column::StartTime => &["start_time"],
            Column::ReadLen => &["sequence_length_template", "num_bases", "read_len"],
            Column::MeanQscore => &["mean_qscore_template", "mean_qscore"],
            Column::Barcode => &["barcode_arrangement", "barcode"],
            Column::RefId => &["ref_id", "alignment_genome"],
            Column::RefStart => &["ref_start", "alignment_genome_start"],
            Column::RefEnd => &["ref_end", "alignment_genome_end"],
            Column::AlignLen => &["align_len", "alignment_length"],
            Column::Insertion => &["insertion", "alignment_num_insertions"],
            Column::Deletion => &["deletion", "alignment_num_deletions"],
            Column::Mismatch => &["mismatch", "alignment_num_mismatches"],
            Column::SoftClip => &["soft_clip"],
            Column::IdentityFreq => &["identity_freq", "alignment_identity"],
        }
    }

    /// Looks a column up by one of its header names.
    pub fn from_header(name: &str) -> Option<Column> {
        Self::ALL
            .iter()
            .find(|column| column.aliases().contains(&name))
            .copied()
    }

    fn is_required(&self) -> bool {
        matches!(
            self,
            Column::RunId | Column::Channel | Column::StartTime | Column::ReadLen
        )
    }

    fn is_alignment(&self) -> bool {
        matches!(
            self,
            Column::RefId
                | Column::RefStart
                | Column::RefEnd
                | Column::AlignLen
                | Column::Insertion
                | Column::Deletion
                | Column::Mismatch
                | Column::SoftClip
        )
    }

    fn is_in(&self, schema: &Schema) -> bool {
        match self {
            Column::Barcode => schema.barcode,
            Column::IdentityFreq => schema.alignment && schema.identity_freq,
            c if c.is_alignment() => schema.alignment,
            _ => true,
        }
    }
}

//========//
// Header //
//========//

/// Maps recognized columns to their position within a row.
#[derive(Debug)]
struct Header {
    positions: IndexMap<Column, usize>,
}

impl Header {
    fn from_record(names: &StringRecord) -> Self {
        let mut positions = IndexMap::new();

        for (i, name) in names.iter().enumerate() {
            match Column::from_header(name) {
                // The first occurrence of a column wins.
                Some(column) => {
                    positions.entry(column).or_insert(i);
                }
                None => debug!("Ignoring column {}.", name),
            }
        }

        Header { positions }
    }

    fn has(&self, column: Column) -> bool {
        self.positions.contains_key(&column)
    }

    fn schema(&self) -> Schema {
        let alignment = self.has(Column::RefId);
        Schema {
            barcode: self.has(Column::Barcode),
            alignment,
            identity_freq: alignment && self.has(Column::IdentityFreq),
        }
    }

    // Columns that must be present for a schema. Mismatch and indel counts
    // default to zero, and the quality score to missing.
    fn check(&self, schema: &Schema) -> anyhow::Result<()> {
        let missing = Column::ALL
            .iter()
            .filter(|c| match c {
                Column::MeanQscore
                | Column::Insertion
                | Column::Deletion
                | Column::Mismatch
                | Column::SoftClip => false,
                c => c.is_required() || c.is_in(schema),
            })
            .filter(|c| !self.has(**c))
            .map(|c| c.aliases()[0])
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            bail!("Missing required columns: {}", missing.join(", "));
        }

        Ok(())
    }
}

//=========//
// Reading //
//=========//

/// Attempts to read a sequencing summary file into a [`ReadTable`].
///
/// When `schema` is `None`, the optional column groups are inferred from the
/// header. Rows missing a required value, or whose values cannot be parsed,
/// are dropped and counted.
pub fn read<P>(src: P, schema: Option<Schema>) -> anyhow::Result<ReadTable>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    info!("Reading sequencing summary {}.", path.display());

    let reader = formats::reader(path)?;
    let table = read_from(reader, schema)
        .with_context(|| format!("Could not read sequencing summary {}", path.display()))?;

    info!("  [*] Loaded {} reads.", thousands(table.len() as u64));
    Ok(table)
}

/// Reads a sequencing summary from any reader. See [`read`].
pub fn read_from<R>(reader: R, schema: Option<Schema>) -> anyhow::Result<ReadTable>
where
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // (1) Resolve the header aliases once and settle the schema.
    let names = reader.headers()?;
    if names.is_empty() {
        bail!("File is empty: no header found");
    }

    let header = Header::from_record(names);
    let schema = schema.unwrap_or_else(|| header.schema());
    header.check(&schema)?;
    debug!("Schema: {:?}.", schema);

    // (2) Parse every row.
    let mut builder = ReadTable::builder(schema);
    let mut counter = RowCounter::new(None);
    let mut dropped = 0usize;
    let mut record = StringRecord::new();

    while reader.read_record(&mut record)? {
        counter.inc();

        let pushed = parse_record(&header, &schema, &record)
            .and_then(|read| builder.push(read).ok());

        if pushed.is_none() {
            debug!(
                "Dropping incomplete row on line {}.",
                record.position().map(|p| p.line()).unwrap_or_default()
            );
            dropped += 1;
        }
    }

    if dropped > 0 {
        warn!(
            "Dropped {} of {} rows with missing or invalid values.",
            thousands(dropped as u64),
            thousands(counter.get() as u64)
        );
    }

    Ok(builder.build())
}

fn parse_record(header: &Header, schema: &Schema, fields: &StringRecord) -> Option<ReadRecord> {
    let get = |column: Column| {
        let value = fields.get(*header.positions.get(&column)?)?;
        match is_missing(value) {
            true => None,
            false => Some(value),
        }
    };

    let mean_qscore = match get(Column::MeanQscore) {
        Some(value) => value.parse::<f64>().ok()?,
        None => f64::NAN,
    };

    let mut record = ReadRecord::new(
        get(Column::RunId)?,
        get(Column::Channel)?.parse().ok()?,
        get(Column::StartTime)?.parse().ok()?,
        get(Column::ReadLen)?.parse().ok()?,
        mean_qscore,
    );

    if schema.barcode {
        record = record.with_barcode(get(Column::Barcode)?);
    }

    if schema.alignment {
        if let Some(ref_id) = get(Column::RefId).filter(|id| *id != UNALIGNED) {
            let count = |column: Column| -> Option<u64> {
                match get(column) {
                    Some(value) => value.parse().ok(),
                    None => Some(0),
                }
            };

            let identity_freq = match schema.identity_freq {
                true => Some(get(Column::IdentityFreq)?.parse().ok()?),
                false => None,
            };

            record = record.with_alignment(Alignment {
                ref_id: ref_id.to_string(),
                ref_start: get(Column::RefStart)?.parse().ok()?,
                ref_end: get(Column::RefEnd)?.parse().ok()?,
                align_len: get(Column::AlignLen)?.parse().ok()?,
                insertion: count(Column::Insertion)?,
                deletion: count(Column::Deletion)?,
                mismatch: count(Column::Mismatch)?,
                soft_clip: count(Column::SoftClip)?,
                identity_freq,
            });
        }
    }

    Some(record)
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("na")
}

//=========//
// Writing //
//=========//

/// Attempts to write a [`ReadTable`] as a sequencing summary file with the
/// canonical column names. The file is gzipped if its name ends in `.gz`.
pub fn write<P>(table: &ReadTable, dst: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = dst.as_ref();
    let writer = formats::writer(path)?;

    write_to(table, writer)
        .with_context(|| format!("Could not write sequencing summary {}", path.display()))?;

    info!(
        "Wrote {} reads to {}.",
        thousands(table.len() as u64),
        path.display()
    );
    Ok(())
}

/// Writes a [`ReadTable`] to any writer. See [`write`].
pub fn write_to<W>(table: &ReadTable, writer: W) -> anyhow::Result<()>
where
    W: Write,
{
    let schema = table.schema();
    let columns = Column::ALL
        .iter()
        .filter(|c| c.is_in(&schema))
        .copied()
        .collect::<Vec<_>>();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    writer.write_record(columns.iter().map(|c| c.aliases()[0]))?;
    for row in 0..table.len() {
        let record = table.record(row);
        writer.write_record(columns.iter().map(|c| format_field(&record, *c)))?;
    }

    writer.flush()?;
    Ok(())
}

fn format_field(record: &ReadRecord, column: Column) -> String {
    let alignment = record.alignment.as_ref();
    let count = |f: fn(&Alignment) -> u64| alignment.map(|a| f(a).to_string()).unwrap_or_default();

    match column {
        Column::RunId => record.run_id.clone(),
        Column::Channel => record.channel.to_string(),
        Column::StartTime => record.start_time.to_string(),
        Column::ReadLen => record.read_len.to_string(),
        Column::MeanQscore => record.mean_qscore.map(|q| q.to_string()).unwrap_or_default(),
        Column::Barcode => record.barcode.clone().unwrap_or_default(),
        Column::RefId => alignment
            .map(|a| a.ref_id.clone())
            .unwrap_or_else(|| UNALIGNED.to_string()),
        Column::RefStart => count(|a| a.ref_start),
        Column::RefEnd => count(|a| a.ref_end),
        Column::AlignLen => count(|a| a.align_len),
        Column::Insertion => count(|a| a.insertion),
        Column::Deletion => count(|a| a.deletion),
        Column::Mismatch => count(|a| a.mismatch),
        Column::SoftClip => count(|a| a.soft_clip),
        Column::IdentityFreq => alignment
            .and_then(|a| a.identity_freq)
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}

//============//
// References //
//============//

/// Attempts to read reference lengths from a file of `name<TAB>length`
/// lines. Blank lines and lines starting with `#` are skipped.
pub fn read_references<P>(src: P) -> anyhow::Result<IndexMap<String, u64>>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(formats::reader(path)?);

    let mut references = IndexMap::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let (name, length) = match (record.get(0), record.get(1)) {
            (Some(name), Some(length)) => (name, length),
            _ => bail!(
                "{}:{}: expected a name and a length separated by a tab",
                path.display(),
                line
            ),
        };

        let length = length.parse::<u64>().with_context(|| {
            format!("{}:{}: invalid length {}", path.display(), line, length)
        })?;

        references.insert(name.to_string(), length);
    }

    debug!(
        "Read {} reference lengths from {}.",
        references.len(),
        path.display()
    );
    Ok(references)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::table::tests::fixture;
    use crate::table::Field;

    fn scratch(name: &str) -> PathBuf {
        let directory = std::env::temp_dir().join(format!("lrqc-summary-{}", std::process::id()));
        fs::create_dir_all(&directory).unwrap();
        directory.join(name)
    }

    #[test]
    fn test_aliases_and_inferred_schema() {
        let text = "\
read_id\trun_id\tchannel\tstart_time\tnum_bases\tmean_qscore\tbarcode_arrangement
r1\trun\t5\t10.5\t1500\t9.5\tbarcode01
r2\trun\t700\t20\t4000\t6.0\tbarcode02
";
        let table = read_from(text.as_bytes(), None).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.schema(),
            Schema {
                barcode: true,
                ..Default::default()
            }
        );
        assert_eq!(table.read_len(1), 4000);
        assert_eq!(table.barcode(0), Some("barcode01"));
        assert!(table.capabilities().is_promethion);
    }

    #[test]
    fn test_crlf_and_padded_fields() {
        let text = "run_id\tchannel\tstart_time\tread_len\tmean_qscore\r\n\
                    run \t 7\t12.5\t 900\t8.5\r\n\
                    run\t8\t13\t1000\t\r\n";
        let table = read_from(text.as_bytes(), None).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.run_id(0), "run");
        assert_eq!(table.channel(0), 7);
        assert_eq!(table.read_len(0), 900);
        assert_eq!(table.mean_qscore(0), Some(8.5));
        assert_eq!(table.mean_qscore(1), None);
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let text = "\
run_id\tchannel\tstart_time\tsequence_length_template\tmean_qscore_template
run\t1\t0\t100\t9.0
run\t\t5\t100\t9.0
run\t2\tabc\t100\t9.0
run\t3\t5\t200\tnan

run\t4\t5\t300
";
        let table = read_from(text.as_bytes(), None).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.channel(1), 3);
        assert_eq!(table.mean_qscore(1), None);
        assert_eq!(table.mean_qscore(2), None);
    }

    #[test]
    fn test_alignment_columns() {
        let text = "\
run_id\tchannel\tstart_time\tread_len\tmean_qscore\tref_id\tref_start\tref_end\talign_len\tinsertion\tdeletion\tmismatch\tsoft_clip\tidentity_freq
run\t1\t0\t100\t9.0\tchr1\t10\t100\t90\t1\t2\t3\t4\t0.95
run\t2\t5\t100\t9.0\t*\t\t\t\t\t\t\t\t
";
        let table = read_from(text.as_bytes(), None).unwrap();
        let capabilities = table.capabilities();

        assert!(capabilities.has_alignment);
        assert!(capabilities.has_identity_freq);
        assert_eq!(table.ref_id(0), Some("chr1"));
        assert_eq!(table.ref_id(1), None);
        assert_eq!(table.value(Field::IdentityFreq, 0), Some(0.95));
        assert_eq!(table.count(Field::AlignLen, 1), None);
    }

    #[test]
    fn test_missing_columns() {
        let err = read_from("run_id\tchannel\n".as_bytes(), None).unwrap_err();
        assert!(err.to_string().contains("start_time"));

        let forced = Schema {
            barcode: true,
            ..Default::default()
        };
        let text = "run_id\tchannel\tstart_time\tread_len\n";
        assert!(read_from(text.as_bytes(), Some(forced)).is_err());
        assert!(read_from("".as_bytes(), None).is_err());
    }

    #[test]
    fn test_write_then_read_gzipped() {
        let table = fixture();
        let path = scratch("fixture.tsv.gz");

        write(&table, &path).unwrap();
        let read_back = read(&path, None).unwrap();

        assert_eq!(read_back.len(), table.len());
        assert_eq!(read_back.schema(), table.schema());
        for row in 0..table.len() {
            assert_eq!(read_back.record(row), table.record(row));
        }

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_references() {
        let path = scratch("references.tsv");
        fs::write(&path, "# name\tlength\nchr1\t1000\n\nchr2\t250\n").unwrap();

        let references = read_references(&path).unwrap();
        assert_eq!(references.keys().collect::<Vec<_>>(), ["chr1", "chr2"]);
        assert_eq!(references["chr2"], 250);

        fs::write(&path, "chr1 1000\n").unwrap();
        assert!(read_references(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
