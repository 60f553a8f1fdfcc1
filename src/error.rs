//! Error type shared by the catalog reader, the cross-match pipeline and the transit model.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in this crate.
///
/// None of the numerical code retries or recovers; the first invalid state is handed back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A square root or arccosine received an argument outside its domain.
    #[error("argument outside the domain: {message}")]
    Domain {
        /// What was out of range.
        message: String,
    },

    /// A parameter was rejected before any computation started, e.g. a non-positive threshold or period.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Which parameter and why.
        message: String,
    },

    /// A catalog file could not be parsed.
    #[error("malformed catalog at line {line}: {message}")]
    Catalog {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// Reading a catalog failed.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn catalog(line: usize, message: impl Into<String>) -> Self {
        Self::Catalog {
            line,
            message: message.into(),
        }
    }
}
