//! ncagg - NcML aggregations for collections of netCDF files.
//!
//! ncagg builds NcML documents that let many time-ordered files be served as
//! one continuous dataset without copying any data.
//!
//! # Features
//!
//! - Files ordered by their coordinate values, with overlap detection
//! - Optional caching of coordinate values in the document
//! - Detection of changing units along the aggregation dimension
//! - Global attributes computed across files
//! - Pluggable dataset readers (NetCDF and in-memory included)
//!
//! # Example
//!
//! ```ignore
//! use ncagg::aggregation::{AggregationBuilder, BuildOptions};
//!
//! let builder = AggregationBuilder::netcdf("time");
//! let output = builder.build(&files, &BuildOptions::new().cache(true))?;
//!
//! for warning in &output.diagnostics {
//!     eprintln!("{}", warning);
//! }
//! println!("{}", ncagg::ncml::to_xml_string(&output.document)?);
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod aggregation;
pub mod data;
pub mod error;
pub mod ncml;

pub use error::{AggregateError, Result};
