//! Utilities shared by the engines and the command line.

pub mod display;
pub mod histogram;
pub mod smoothing;
