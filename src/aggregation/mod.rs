//! The aggregation engine.
//!
//! [`AggregationBuilder`] feeds every input file through a fresh
//! [`DatasetCollection`], which keeps the files ordered by coordinate value and
//! rejects overlaps, and then turns the result into an NcML document tree.

mod attribute;
mod builder;
mod collection;
mod interval;

pub use attribute::{AttributeAggregator, Reducer, StockReducer};
pub use builder::{AggregationBuilder, AggregationType, BuildOptions, BuildOutput, NcmlVariable};
pub use collection::{
    DatasetCollection, Diagnostic, DiagnosticKind, FinishedCollection, OutputRecord, UnitState,
};
pub use interval::Interval;
