//! Errors raised by the statistics, sampling, and binning engines.
//!
//! Every error here is local and recoverable: the report layer catches them
//! per figure, logs a diagnostic, and carries on with the remainder of the
//! report. Retrying a failed call with the same input always yields the same
//! error.

use std::fmt;

use serde::Serialize;

/// Custom result type for the `lrqc` engines.
pub type Result<T> = std::result::Result<T, Error>;

/// An optional capability of a read table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Capability {
    /// Demultiplexing information (a barcode column).
    Barcodes,

    /// Alignment information (reference, alignment length, edit counts).
    Alignment,

    /// Per-read identity frequencies derived from alignments.
    IdentityFreq,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Barcodes => write!(f, "barcode"),
            Capability::Alignment => write!(f, "alignment"),
            Capability::IdentityFreq => write!(f, "identity frequency"),
        }
    }
}

/// The main error type for the `lrqc` engines.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// The input subset was empty (or entirely missing) after filtering.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The requested operation needs a column the read table does not have.
    #[error("no {0} information available")]
    CapabilityUnavailable(Capability),

    /// A parameter was outside of its valid range or unknown.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Convenience constructor for [`Error::InsufficientData`].
    pub fn insufficient<I>(message: I) -> Self
    where
        I: Into<String>,
    {
        Error::InsufficientData(message.into())
    }

    /// Convenience constructor for [`Error::InvalidParameter`].
    pub fn invalid<I>(message: I) -> Self
    where
        I: Into<String>,
    {
        Error::InvalidParameter(message.into())
    }
}

/// Ensures a smoothing sigma is usable (finite and non-negative).
pub(crate) fn check_sigma(sigma: f64) -> Result<()> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(Error::invalid(format!(
            "smoothing sigma must be a finite, non-negative number (got {})",
            sigma
        )));
    }

    Ok(())
}

/// Ensures a bin count describes at least one bin (two edges).
pub(crate) fn check_bins(name: &str, nbins: usize) -> Result<()> {
    if nbins < 2 {
        return Err(Error::invalid(format!(
            "{} must be at least 2 (got {})",
            name, nbins
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_message() {
        let err = Error::CapabilityUnavailable(Capability::Barcodes);
        assert_eq!(err.to_string(), "no barcode information available");
    }

    #[test]
    fn test_parameter_checks() {
        assert!(check_sigma(0.0).is_ok());
        assert!(check_sigma(-1.0).is_err());
        assert!(check_sigma(f64::NAN).is_err());
        assert!(check_bins("nbins", 2).is_ok());
        assert!(matches!(
            check_bins("nbins", 1),
            Err(Error::InvalidParameter(_))
        ));
    }
}
