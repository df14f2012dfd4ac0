//! Dataset reading.
//!
//! The aggregation engine only needs two things from a file: the values and
//! units of one coordinate variable, and the occasional scalar global
//! attribute. That capability is described by [`DatasetReader`] and
//! [`OpenDataset`]; any array-file backend can implement it.

mod memory;
mod reader;
mod value;

pub use memory::{MemoryDataset, MemoryReader};
pub use reader::{DatasetReader, NetcdfReader, OpenDataset};
pub use value::{format_number, format_number_f32, AttrValue, CoordinateValues, NumericType};
