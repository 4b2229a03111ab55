//! `lrqc` is a command line tool for the quality control of long-read
//! sequencing runs. It reads the per-read sequencing summary written by a
//! basecaller and produces summary statistics, smoothed distributions, and
//! time series describing the run. This package is composed of both a
//! library crate, as well as a binary crate.
//!
//! The library is organized around an immutable [`table::ReadTable`] and the
//! [`table::View`]s derived from it (all reads or pass reads, complete or
//! sampled). Engines compute on views:
//!
//! * [`stats`] computes exact summary statistics.
//! * [`density`] estimates smoothed one and two dimensional densities.
//! * [`temporal`] bins reads over the course of a run.
//!
//! The [`report`] module ties these together into figures driven by a
//! configuration, and [`plot`] renders them as plotly HTML files.
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]

pub mod commands;
pub mod density;
pub mod errors;
pub mod formats;
pub mod plot;
pub mod report;
pub mod sampling;
pub mod stats;
pub mod table;
pub mod temporal;
pub mod utils;

pub use self::errors::{Error, Result};
