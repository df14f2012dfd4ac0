//! In-memory datasets.
//!
//! [`MemoryReader`] serves datasets built in code instead of files on disk. It
//! records every open so callers can check how the aggregation engine touched
//! its inputs.

use super::{AttrValue, CoordinateValues, DatasetReader, NumericType, OpenDataset};
use crate::error::{AggregateError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct MemoryVariable {
    shape: Vec<usize>,
    values: Vec<f64>,
    units: Option<String>,
    numeric_type: NumericType,
}

/// A dataset held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    variables: HashMap<String, MemoryVariable>,
    attributes: HashMap<String, AttrValue>,
}

impl MemoryDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a one-dimensional coordinate variable.
    pub fn with_coordinate(self, name: &str, values: &[f64], units: Option<&str>) -> Self {
        self.with_variable(name, vec![values.len()], values, units)
    }

    /// Add a one-dimensional coordinate variable stored as `numeric_type`.
    pub fn with_typed_coordinate(
        mut self,
        name: &str,
        values: &[f64],
        units: Option<&str>,
        numeric_type: NumericType,
    ) -> Self {
        self = self.with_coordinate(name, values, units);
        if let Some(var) = self.variables.get_mut(name) {
            var.numeric_type = numeric_type;
        }
        self
    }

    /// Add a double precision variable of arbitrary shape.
    pub fn with_variable(
        mut self,
        name: &str,
        shape: Vec<usize>,
        values: &[f64],
        units: Option<&str>,
    ) -> Self {
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                shape,
                values: values.to_vec(),
                units: units.map(str::to_string),
                numeric_type: NumericType::Float64,
            },
        );
        self
    }

    /// Add a global attribute.
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// Reader over a fixed set of in-memory datasets.
#[derive(Debug, Default)]
pub struct MemoryReader {
    datasets: HashMap<String, MemoryDataset>,
    opened: RefCell<Vec<String>>,
    live: Rc<Cell<usize>>,
    peak: Cell<usize>,
}

impl MemoryReader {
    /// Create a reader with no datasets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under `filename`.
    pub fn with_dataset(mut self, filename: &str, dataset: MemoryDataset) -> Self {
        self.datasets.insert(filename.to_string(), dataset);
        self
    }

    /// Filenames passed to [`DatasetReader::open`], in call order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.live.get()
    }

    /// Largest number of handles that were open at the same time.
    pub fn peak_open_handles(&self) -> usize {
        self.peak.get()
    }
}

impl DatasetReader for MemoryReader {
    fn open(&self, filename: &str) -> Result<Box<dyn OpenDataset + '_>> {
        self.opened.borrow_mut().push(filename.to_string());

        let dataset = self
            .datasets
            .get(filename)
            .ok_or_else(|| AggregateError::file_open(filename, "no such dataset"))?;

        self.live.set(self.live.get() + 1);
        self.peak.set(self.peak.get().max(self.live.get()));

        Ok(Box::new(MemoryHandle {
            filename: filename.to_string(),
            dataset,
            live: Rc::clone(&self.live),
        }))
    }
}

struct MemoryHandle<'a> {
    filename: String,
    dataset: &'a MemoryDataset,
    live: Rc<Cell<usize>>,
}

impl Drop for MemoryHandle<'_> {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

impl OpenDataset for MemoryHandle<'_> {
    fn read_coordinate(&self, dimension: &str) -> Result<CoordinateValues> {
        let var = self.dataset.variables.get(dimension).ok_or_else(|| {
            AggregateError::coordinates(&self.filename, format!("Variable '{}' not found", dimension))
        })?;

        if var.shape.len() != 1 {
            return Err(AggregateError::coordinates(
                &self.filename,
                format!(
                    "Aggregation dimension must be one-dimensional - shape is {:?}",
                    var.shape
                ),
            ));
        }
        if var.values.is_empty() {
            return Err(AggregateError::coordinates(
                &self.filename,
                format!("Variable '{}' has no values", dimension),
            ));
        }

        Ok(CoordinateValues::typed(
            var.units.clone(),
            var.values.clone(),
            var.numeric_type,
        ))
    }

    fn read_attribute(&self, name: &str) -> Result<AttrValue> {
        self.dataset
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| AggregateError::attribute_missing(name, &self.filename))
    }
}
