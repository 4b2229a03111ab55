//! Subcommands of the `lrqc` command line tool.

pub mod list;
pub mod qc;
pub mod sample;

pub use self::list::list;
pub use self::qc::qc;
pub use self::sample::sample;
