//! Error types for ncagg.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Per-file problems (`Coordinates`, `AttributeMissing`, `UnsupportedAttribute`)
//! are recovered from inside the aggregation loop; the remaining variants abort a
//! build.

use thiserror::Error;

/// Result type alias for ncagg operations.
pub type Result<T> = std::result::Result<T, AggregateError>;

/// Errors that can occur while building an aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The coordinate variable of a file is missing or unusable.
    #[error("{reason} in file '{path}'")]
    Coordinates { path: String, reason: String },

    /// A global attribute requested for aggregation is absent from a file.
    #[error("Attribute '{attr}' not found in file '{path}'")]
    AttributeMissing { attr: String, path: String },

    /// A global attribute exists but is not a scalar value.
    #[error("Attribute '{attr}' in file '{path}' is not a scalar")]
    UnsupportedAttribute { attr: String, path: String },

    /// Two files sharing units have intersecting coordinate ranges.
    #[error("File list has overlapping coordinate values ('{existing}' and '{added}')")]
    OverlappingUnits { existing: String, added: String },

    /// Every input file was rejected.
    #[error("No aggregation could be created")]
    NoAggregation,

    /// An attribute aggregator received no values.
    #[error("No values found for aggregated attribute '{attr}'")]
    EmptyAggregator { attr: String },

    /// Failed to open a dataset.
    #[error("Failed to open file '{path}': {reason}")]
    FileOpen { path: String, reason: String },

    /// Failed to read NetCDF file.
    #[error("NetCDF error: {0}")]
    NetCDF(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write the NcML document.
    #[error("XML error: {0}")]
    Xml(String),

    /// A user supplied value could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AggregateError {
    /// Create a Coordinates error.
    pub fn coordinates(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Coordinates {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an AttributeMissing error.
    pub fn attribute_missing(attr: impl Into<String>, path: impl Into<String>) -> Self {
        Self::AttributeMissing {
            attr: attr.into(),
            path: path.into(),
        }
    }

    /// Create a FileOpen error.
    pub fn file_open(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::FileOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error only concerns a single file and the build may carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Coordinates { .. } | Self::AttributeMissing { .. } | Self::UnsupportedAttribute { .. }
        )
    }
}

impl From<netcdf::Error> for AggregateError {
    fn from(err: netcdf::Error) -> Self {
        Self::NetCDF(err.to_string())
    }
}

impl From<quick_xml::Error> for AggregateError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}
