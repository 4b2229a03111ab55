//! Utilities related to the file formats read and written by `lrqc`.

pub mod summary;

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Whether a path names a gzipped file (by extension).
pub fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("gz")
}

/// Attempts to open a file for buffered reading, decompressing it on the fly
/// if its name ends in `.gz`.
pub fn reader<P>(src: P) -> anyhow::Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let path = src.as_ref();
    let file =
        File::open(path).with_context(|| format!("Could not open {}", path.display()))?;

    match is_gzipped(path) {
        true => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        false => Ok(Box::new(BufReader::new(file))),
    }
}

/// Attempts to create a file for buffered writing, compressing it on the fly
/// if its name ends in `.gz`.
pub fn writer<P>(dst: P) -> anyhow::Result<Box<dyn Write>>
where
    P: AsRef<Path>,
{
    let path = dst.as_ref();
    let file =
        File::create(path).with_context(|| format!("Could not create {}", path.display()))?;

    match is_gzipped(path) {
        true => Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        )))),
        false => Ok(Box::new(BufWriter::new(file))),
    }
}
