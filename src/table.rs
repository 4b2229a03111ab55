//! The read table: an immutable, columnar representation of every read
//! reported for one sequencing run (or several runs, tagged by run
//! identifier).
//!
//! # Overview
//!
//! A [`ReadTable`] is built once from the records produced by an ingestion
//! step (see [`crate::formats::summary`]) through a [`ReadTableBuilder`]. The
//! builder is given a [`Schema`] up front that declares which optional column
//! groups exist (barcodes, alignment statistics, identity frequencies). From
//! the schema and the data, a [`Capabilities`] struct is computed exactly once
//! and every gated operation downstream checks it before doing any work.
//!
//! ```
//! use lrqc::table::{ReadRecord, ReadTable, Schema};
//!
//! let mut builder = ReadTable::builder(Schema::default());
//! builder.push(ReadRecord::new("run_1", 5, 0.0, 1_500, 9.5)).unwrap();
//! builder.push(ReadRecord::new("run_1", 700, 3_600.0, 4_000, 6.0)).unwrap();
//! let table = builder.build();
//!
//! assert_eq!(table.len(), 2);
//! assert!(table.capabilities().is_promethion);
//! assert!(!table.capabilities().has_barcodes);
//! ```
//!
//! Tables are never partially updated: the rows are a closed snapshot of a
//! run and all engines operate on [`View`]s (row subsets) of them.

pub mod categorical;
pub mod view;

use serde::Serialize;

pub use self::categorical::Categorical;
pub use self::view::{PassFilter, View, ViewLevel, Views};

use crate::errors::{Capability, Error, Result};

/// The number of channels on a MinION/GridION flowcell.
pub const MINION_CHANNELS: u32 = 512;

/// The number of channels on a PromethION flowcell.
pub const PROMETHION_CHANNELS: u32 = 3000;

//========//
// Schema //
//========//

/// Declares which optional column groups a read table carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    /// Whether a barcode column exists.
    pub barcode: bool,

    /// Whether alignment columns exist.
    pub alignment: bool,

    /// Whether an identity frequency column exists (requires `alignment`).
    pub identity_freq: bool,
}

/// Capability flags derived once when a [`ReadTable`] is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Demultiplexing information is present.
    pub has_barcodes: bool,

    /// Alignment information is present.
    pub has_alignment: bool,

    /// Identity frequencies are present.
    pub has_identity_freq: bool,

    /// The run was performed on a PromethION (some channel above 512).
    pub is_promethion: bool,
}

impl Capabilities {
    /// Fails with [`Error::CapabilityUnavailable`] if the capability is absent.
    pub fn require(&self, capability: Capability) -> Result<()> {
        let present = match capability {
            Capability::Barcodes => self.has_barcodes,
            Capability::Alignment => self.has_alignment,
            Capability::IdentityFreq => self.has_identity_freq,
        };

        match present {
            true => Ok(()),
            false => Err(Error::CapabilityUnavailable(capability)),
        }
    }

    /// The number of channels on the device class that produced the run.
    pub fn n_channels(&self) -> u32 {
        match self.is_promethion {
            true => PROMETHION_CHANNELS,
            false => MINION_CHANNELS,
        }
    }
}

//========//
// Fields //
//========//

/// A numeric per-read field that engines can compute statistics over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Basecalled read length.
    ReadLen,
    /// Mean read quality score.
    MeanQscore,
    /// Start time (seconds since the start of the run).
    StartTime,
    /// Channel number.
    Channel,
    /// Length of the alignment.
    AlignLen,
    /// Identity frequency of the alignment.
    IdentityFreq,
    /// Number of inserted bases in the alignment.
    Insertion,
    /// Number of deleted bases in the alignment.
    Deletion,
    /// Number of mismatched bases in the alignment.
    Mismatch,
    /// Number of soft clipped bases in the alignment.
    SoftClip,
}

impl Field {
    /// The column name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Field::ReadLen => "read_len",
            Field::MeanQscore => "mean_qscore",
            Field::StartTime => "start_time",
            Field::Channel => "channel",
            Field::AlignLen => "align_len",
            Field::IdentityFreq => "identity_freq",
            Field::Insertion => "insertion",
            Field::Deletion => "deletion",
            Field::Mismatch => "mismatch",
            Field::SoftClip => "soft_clip",
        }
    }

    /// The capability needed to read this field, if any.
    pub fn requires(&self) -> Option<Capability> {
        match self {
            Field::ReadLen | Field::MeanQscore | Field::StartTime | Field::Channel => None,
            Field::IdentityFreq => Some(Capability::IdentityFreq),
            Field::AlignLen
            | Field::Insertion
            | Field::Deletion
            | Field::Mismatch
            | Field::SoftClip => Some(Capability::Alignment),
        }
    }
}

//=========//
// Records //
//=========//

/// Alignment statistics for a single read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Alignment {
    /// Name of the reference sequence the read aligned to.
    pub ref_id: String,
    /// Start of the alignment on the reference.
    pub ref_start: u64,
    /// End of the alignment on the reference.
    pub ref_end: u64,
    /// Length of the alignment.
    pub align_len: u64,
    /// Inserted bases.
    pub insertion: u64,
    /// Deleted bases.
    pub deletion: u64,
    /// Mismatched bases.
    pub mismatch: u64,
    /// Soft clipped bases.
    pub soft_clip: u64,
    /// Identity frequency, when the schema carries one.
    pub identity_freq: Option<f64>,
}

/// A single read as handed over by an ingestion step.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadRecord {
    /// Identifier of the sequencing run.
    pub run_id: String,
    /// Demultiplexing barcode, if any.
    pub barcode: Option<String>,
    /// Channel the read was sequenced on (1-based).
    pub channel: u32,
    /// Seconds since the start of the run.
    pub start_time: f64,
    /// Basecalled length.
    pub read_len: u64,
    /// Mean quality score (missing values are `None`).
    pub mean_qscore: Option<f64>,
    /// Alignment statistics, if the read aligned.
    pub alignment: Option<Alignment>,
}

impl ReadRecord {
    /// Creates a new [`ReadRecord`] without barcode or alignment information.
    pub fn new<I>(run_id: I, channel: u32, start_time: f64, read_len: u64, mean_qscore: f64) -> Self
    where
        I: Into<String>,
    {
        ReadRecord {
            run_id: run_id.into(),
            barcode: None,
            channel,
            start_time,
            read_len,
            mean_qscore: match mean_qscore.is_nan() {
                true => None,
                false => Some(mean_qscore),
            },
            alignment: None,
        }
    }

    /// Sets the barcode of the record.
    pub fn with_barcode<I>(mut self, barcode: I) -> Self
    where
        I: Into<String>,
    {
        self.barcode = Some(barcode.into());
        self
    }

    /// Sets the alignment statistics of the record.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

//=======//
// Table //
//=======//

#[derive(Clone, Debug, Default)]
struct AlignmentColumns {
    ref_id: Categorical,
    ref_start: Vec<Option<u64>>,
    ref_end: Vec<Option<u64>>,
    align_len: Vec<Option<u64>>,
    insertion: Vec<Option<u64>>,
    deletion: Vec<Option<u64>>,
    mismatch: Vec<Option<u64>>,
    soft_clip: Vec<Option<u64>>,
    identity_freq: Option<Vec<f64>>,
}

/// An immutable columnar table of reads.
#[derive(Clone, Debug)]
pub struct ReadTable {
    schema: Schema,
    run_id: Categorical,
    barcode: Option<Categorical>,
    channel: Vec<u32>,
    start_time: Vec<f64>,
    read_len: Vec<u64>,
    // Missing values are stored as NaN.
    mean_qscore: Vec<f64>,
    alignment: Option<AlignmentColumns>,
    capabilities: Capabilities,
}

impl ReadTable {
    /// Starts building a table with the given schema.
    pub fn builder(schema: Schema) -> ReadTableBuilder {
        ReadTableBuilder::new(schema)
    }

    /// Number of reads in the table.
    pub fn len(&self) -> usize {
        self.read_len.len()
    }

    /// Whether the table holds no reads.
    pub fn is_empty(&self) -> bool {
        self.read_len.is_empty()
    }

    /// The schema the table was built with.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Capability flags computed at build time.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The run identifier column.
    pub fn run_ids(&self) -> &Categorical {
        &self.run_id
    }

    /// The barcode column.
    pub fn barcodes(&self) -> Result<&Categorical> {
        self.barcode
            .as_ref()
            .ok_or(Error::CapabilityUnavailable(Capability::Barcodes))
    }

    /// The run identifier of a row.
    pub fn run_id(&self, row: usize) -> &str {
        self.run_id.get(row).unwrap_or_default()
    }

    /// The barcode of a row, if the table has barcodes.
    pub fn barcode(&self, row: usize) -> Option<&str> {
        self.barcode.as_ref().and_then(|b| b.get(row))
    }

    /// The channel of a row.
    pub fn channel(&self, row: usize) -> u32 {
        self.channel[row]
    }

    /// The start time (in seconds) of a row.
    pub fn start_time(&self, row: usize) -> f64 {
        self.start_time[row]
    }

    /// The read length of a row.
    pub fn read_len(&self, row: usize) -> u64 {
        self.read_len[row]
    }

    /// The mean quality score of a row, if present.
    pub fn mean_qscore(&self, row: usize) -> Option<f64> {
        let q = self.mean_qscore[row];
        match q.is_nan() {
            true => None,
            false => Some(q),
        }
    }

    /// The reference a row aligned to, if any.
    pub fn ref_id(&self, row: usize) -> Option<&str> {
        self.alignment.as_ref().and_then(|a| a.ref_id.get(row))
    }

    /// An integer-valued field of a row, if present. Only length and count
    /// fields are integer valued; other fields return `None`.
    pub fn count(&self, field: Field, row: usize) -> Option<u64> {
        match field {
            Field::ReadLen => Some(self.read_len[row]),
            Field::Channel => Some(u64::from(self.channel[row])),
            Field::AlignLen => self.alignment.as_ref().and_then(|a| a.align_len[row]),
            Field::Insertion => self.alignment.as_ref().and_then(|a| a.insertion[row]),
            Field::Deletion => self.alignment.as_ref().and_then(|a| a.deletion[row]),
            Field::Mismatch => self.alignment.as_ref().and_then(|a| a.mismatch[row]),
            Field::SoftClip => self.alignment.as_ref().and_then(|a| a.soft_clip[row]),
            Field::MeanQscore | Field::StartTime | Field::IdentityFreq => None,
        }
    }

    /// Any numeric field of a row as a float, if present.
    pub fn value(&self, field: Field, row: usize) -> Option<f64> {
        match field {
            Field::MeanQscore => self.mean_qscore(row),
            Field::StartTime => Some(self.start_time[row]),
            Field::IdentityFreq => self
                .alignment
                .as_ref()
                .and_then(|a| a.identity_freq.as_ref())
                .map(|f| f[row])
                .filter(|v| !v.is_nan()),
            _ => self.count(field, row).map(|v| v as f64),
        }
    }

    /// Reconstructs the record for a row.
    pub fn record(&self, row: usize) -> ReadRecord {
        let alignment = self.alignment.as_ref().and_then(|a| {
            Some(Alignment {
                ref_id: a.ref_id.get(row)?.to_string(),
                ref_start: a.ref_start[row]?,
                ref_end: a.ref_end[row]?,
                align_len: a.align_len[row]?,
                insertion: a.insertion[row].unwrap_or_default(),
                deletion: a.deletion[row].unwrap_or_default(),
                mismatch: a.mismatch[row].unwrap_or_default(),
                soft_clip: a.soft_clip[row].unwrap_or_default(),
                identity_freq: self.value(Field::IdentityFreq, row),
            })
        });

        ReadRecord {
            run_id: self.run_id(row).to_string(),
            barcode: self.barcode(row).map(String::from),
            channel: self.channel[row],
            start_time: self.start_time[row],
            read_len: self.read_len[row],
            mean_qscore: self.mean_qscore(row),
            alignment,
        }
    }

    /// Builds a new table holding only the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Result<ReadTable> {
        let mut builder = ReadTableBuilder::new(self.schema);
        for row in rows {
            builder.push(self.record(*row))?;
        }

        Ok(builder.build())
    }
}

//=========//
// Builder //
//=========//

/// Incrementally builds a [`ReadTable`], validating each record.
#[derive(Debug)]
pub struct ReadTableBuilder {
    table: ReadTable,
    max_channel: u32,
}

impl ReadTableBuilder {
    /// Creates an empty builder for the given schema.
    pub fn new(schema: Schema) -> Self {
        let alignment = schema.alignment.then(|| AlignmentColumns {
            identity_freq: schema.identity_freq.then(Vec::new),
            ..Default::default()
        });

        ReadTableBuilder {
            table: ReadTable {
                schema,
                run_id: Categorical::new(),
                barcode: schema.barcode.then(Categorical::new),
                channel: Vec::new(),
                start_time: Vec::new(),
                read_len: Vec::new(),
                mean_qscore: Vec::new(),
                alignment,
                capabilities: Capabilities::default(),
            },
            max_channel: 0,
        }
    }

    /// Number of records pushed so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no records have been pushed.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Validates and appends a record. Nothing is appended on error.
    pub fn push(&mut self, record: ReadRecord) -> Result<()> {
        // (1) Validate everything before touching any column, so that a
        // rejected record never leaves the columns at different lengths.
        if record.channel == 0 {
            return Err(Error::invalid("channel numbers start at 1"));
        }

        if !record.start_time.is_finite() || record.start_time < 0.0 {
            return Err(Error::invalid(format!(
                "start time must be finite and non-negative (got {})",
                record.start_time
            )));
        }

        if let Some(q) = record.mean_qscore {
            if !q.is_finite() {
                return Err(Error::invalid("mean quality score must be finite"));
            }
        }

        let schema = self.table.schema;
        if schema.barcode != record.barcode.is_some() {
            return Err(Error::invalid(match schema.barcode {
                true => "record is missing a barcode",
                false => "record has a barcode but the schema has no barcode column",
            }));
        }

        if !schema.alignment && record.alignment.is_some() {
            return Err(Error::invalid(
                "record has alignment information but the schema has no alignment columns",
            ));
        }

        let ref_id = record.alignment.as_ref().map(|a| a.ref_id.as_str());
        self.table.run_id.check(Some(&record.run_id))?;
        if let Some(column) = self.table.barcode.as_ref() {
            column.check(record.barcode.as_deref())?;
        }
        if let Some(columns) = self.table.alignment.as_ref() {
            columns.ref_id.check(ref_id)?;
        }

        // (2) Append to every column.
        let table = &mut self.table;
        table.run_id.push(Some(&record.run_id))?;
        if let Some(column) = table.barcode.as_mut() {
            column.push(record.barcode.as_deref())?;
        }

        table.channel.push(record.channel);
        table.start_time.push(record.start_time);
        table.read_len.push(record.read_len);
        table.mean_qscore.push(record.mean_qscore.unwrap_or(f64::NAN));

        if let Some(columns) = table.alignment.as_mut() {
            let a = record.alignment.as_ref();
            columns.ref_id.push(ref_id)?;
            columns.ref_start.push(a.map(|a| a.ref_start));
            columns.ref_end.push(a.map(|a| a.ref_end));
            columns.align_len.push(a.map(|a| a.align_len));
            columns.insertion.push(a.map(|a| a.insertion));
            columns.deletion.push(a.map(|a| a.deletion));
            columns.mismatch.push(a.map(|a| a.mismatch));
            columns.soft_clip.push(a.map(|a| a.soft_clip));
            if let Some(identity) = columns.identity_freq.as_mut() {
                identity.push(a.and_then(|a| a.identity_freq).unwrap_or(f64::NAN));
            }
        }

        self.max_channel = self.max_channel.max(record.channel);
        Ok(())
    }

    /// Finishes the table and computes its capability flags.
    pub fn build(self) -> ReadTable {
        let mut table = self.table;
        let schema = table.schema;

        table.capabilities = Capabilities {
            has_barcodes: schema.barcode,
            has_alignment: schema.alignment,
            has_identity_freq: schema.alignment && schema.identity_freq,
            is_promethion: self.max_channel > MINION_CHANNELS,
        };

        table
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small two-run table used across the crate's tests.
    pub(crate) fn fixture() -> ReadTable {
        let mut builder = ReadTable::builder(Schema {
            barcode: true,
            ..Default::default()
        });

        let rows = [
            ("run_b", "barcode02", 1, 0.0, 100, 12.0),
            ("run_b", "barcode01", 2, 1800.0, 400, 6.0),
            ("run_a", "barcode01", 2, 3600.0, 300, 9.0),
            ("run_a", "barcode02", 5, 5400.0, 200, 7.0),
            ("run_b", "barcode01", 5, 7200.0, 1000, 11.0),
        ];

        for (run_id, barcode, channel, start_time, read_len, qscore) in rows {
            builder
                .push(
                    ReadRecord::new(run_id, channel, start_time, read_len, qscore)
                        .with_barcode(barcode),
                )
                .unwrap();
        }

        builder.build()
    }

    #[test]
    fn test_build_and_access() {
        let table = fixture();
        assert_eq!(table.len(), 5);
        assert_eq!(table.run_id(2), "run_a");
        assert_eq!(table.barcode(0), Some("barcode02"));
        assert_eq!(table.read_len(4), 1000);
        assert_eq!(table.value(Field::MeanQscore, 1), Some(6.0));
        assert_eq!(table.value(Field::AlignLen, 1), None);

        let capabilities = table.capabilities();
        assert!(capabilities.has_barcodes);
        assert!(!capabilities.has_alignment);
        assert!(!capabilities.is_promethion);
        assert_eq!(capabilities.n_channels(), 512);
    }

    #[test]
    fn test_missing_quality_is_nan_backed() {
        let mut builder = ReadTable::builder(Schema::default());
        builder
            .push(ReadRecord::new("run", 1, 0.0, 10, f64::NAN))
            .unwrap();
        let table = builder.build();
        assert_eq!(table.mean_qscore(0), None);
        assert_eq!(table.value(Field::MeanQscore, 0), None);
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let mut builder = ReadTable::builder(Schema::default());
        assert!(builder.push(ReadRecord::new("run", 0, 0.0, 10, 7.0)).is_err());
        assert!(builder.push(ReadRecord::new("run", 1, -1.0, 10, 7.0)).is_err());
        assert!(builder
            .push(ReadRecord::new("run", 1, 0.0, 10, 7.0).with_barcode("bc"))
            .is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn test_rejected_categorical_leaves_columns_aligned() {
        let mut builder = ReadTable::builder(Schema {
            barcode: true,
            ..Default::default()
        });
        builder.table.barcode = Some(Categorical::with_max_levels(1));

        builder
            .push(ReadRecord::new("run_a", 1, 0.0, 100, 9.0).with_barcode("bc01"))
            .unwrap();
        assert!(matches!(
            builder.push(ReadRecord::new("run_b", 2, 60.0, 200, 8.0).with_barcode("bc02")),
            Err(Error::InvalidParameter(_))
        ));
        builder
            .push(ReadRecord::new("run_c", 3, 120.0, 300, 7.0).with_barcode("bc01"))
            .unwrap();

        let table = builder.build();
        assert_eq!(table.len(), 2);
        assert_eq!(table.run_ids().levels(), ["run_a", "run_c"]);
        assert_eq!(table.run_id(1), "run_c");
        assert_eq!(table.barcode(1), Some("bc01"));
        assert_eq!(table.channel(1), 3);
    }

    #[test]
    fn test_capability_gating() {
        let table = fixture();
        let capabilities = table.capabilities();
        assert!(capabilities.require(Capability::Barcodes).is_ok());
        assert_eq!(
            capabilities.require(Capability::Alignment),
            Err(Error::CapabilityUnavailable(Capability::Alignment))
        );
    }

    #[test]
    fn test_alignment_columns_and_take() {
        let mut builder = ReadTable::builder(Schema {
            alignment: true,
            identity_freq: true,
            ..Default::default()
        });

        let alignment = Alignment {
            ref_id: "chr1".to_string(),
            ref_start: 10,
            ref_end: 110,
            align_len: 100,
            insertion: 2,
            deletion: 3,
            mismatch: 4,
            soft_clip: 0,
            identity_freq: Some(0.95),
        };

        builder
            .push(ReadRecord::new("run", 600, 0.0, 120, 9.0).with_alignment(alignment.clone()))
            .unwrap();
        builder
            .push(ReadRecord::new("run", 3, 10.0, 50, 8.0))
            .unwrap();
        let table = builder.build();

        assert!(table.capabilities().has_identity_freq);
        assert!(table.capabilities().is_promethion);
        assert_eq!(table.count(Field::AlignLen, 0), Some(100));
        assert_eq!(table.count(Field::AlignLen, 1), None);
        assert_eq!(table.value(Field::IdentityFreq, 0), Some(0.95));
        assert_eq!(table.ref_id(0), Some("chr1"));

        let taken = table.take(&[1, 0]).unwrap();
        assert_eq!(taken.record(1).alignment, Some(alignment));
        assert_eq!(taken.record(0).alignment, None);
    }
}
