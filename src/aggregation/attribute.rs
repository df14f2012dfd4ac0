//! Global attributes computed across files.

use crate::data::AttrValue;
use crate::error::{AggregateError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Reduces the values contributed by each file to a single value.
pub type Reducer = Arc<dyn Fn(&[AttrValue]) -> AttrValue + Send + Sync>;

/// Collects one global attribute from every file in an aggregation.
///
/// The reducer is only called once at least one value has been contributed.
#[derive(Clone)]
pub struct AttributeAggregator {
    name: String,
    values: Vec<AttrValue>,
    reducer: Reducer,
}

impl fmt::Debug for AttributeAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeAggregator")
            .field("name", &self.name)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl AttributeAggregator {
    /// Create an aggregator for attribute `name` with a custom reducer.
    pub fn new<F>(name: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&[AttrValue]) -> AttrValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            values: Vec::new(),
            reducer: Arc::new(reducer),
        }
    }

    /// Create an aggregator using one of the stock reducers.
    pub fn stock(name: impl Into<String>, reducer: StockReducer) -> Self {
        match reducer {
            StockReducer::First => Self::new(name, |values: &[AttrValue]| values[0].clone()),
            StockReducer::Last => Self::new(name, |values: &[AttrValue]| values[values.len() - 1].clone()),
            StockReducer::Min => Self::new(name, |values: &[AttrValue]| extreme(values, Ordering::Less)),
            StockReducer::Max => Self::new(name, |values: &[AttrValue]| extreme(values, Ordering::Greater)),
            StockReducer::Unique => Self::new(name, unique),
        }
    }

    /// An aggregator with the same name and reducer but no contributions.
    pub fn fresh(&self) -> Self {
        Self {
            name: self.name.clone(),
            values: Vec::new(),
            reducer: Arc::clone(&self.reducer),
        }
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values contributed so far, in contribution order.
    pub fn contributions(&self) -> &[AttrValue] {
        &self.values
    }

    /// Contribute the value read from one file.
    pub fn add(&mut self, value: AttrValue) {
        self.values.push(value);
    }

    /// Reduce the contributed values.
    pub fn value(&self) -> Result<AttrValue> {
        if self.values.is_empty() {
            return Err(AggregateError::EmptyAggregator {
                attr: self.name.clone(),
            });
        }
        Ok((self.reducer)(&self.values))
    }
}

/// Parses `NAME=REDUCER`, e.g. `date_created=max`.
impl FromStr for AttributeAggregator {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, reducer) = s.split_once('=').ok_or_else(|| {
            AggregateError::InvalidArgument(format!(
                "Invalid aggregated attribute '{}'. Should be of the form '<attr>=<reducer>'",
                s
            ))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AggregateError::InvalidArgument(format!(
                "Missing attribute name in '{}'",
                s
            )));
        }
        Ok(Self::stock(name, reducer.trim().parse()?))
    }
}

/// Built-in reducers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockReducer {
    /// Value from the first file that has the attribute.
    First,
    /// Value from the last file that has the attribute.
    Last,
    /// Smallest value; numbers compare numerically, anything else as text.
    Min,
    /// Largest value.
    Max,
    /// The single common value, or the distinct values joined with `", "`.
    Unique,
}

impl FromStr for StockReducer {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(StockReducer::First),
            "last" => Ok(StockReducer::Last),
            "min" => Ok(StockReducer::Min),
            "max" => Ok(StockReducer::Max),
            "unique" => Ok(StockReducer::Unique),
            other => Err(AggregateError::InvalidArgument(format!(
                "Unknown reducer '{}' (expected first, last, min, max or unique)",
                other
            ))),
        }
    }
}

fn compare(a: &AttrValue, b: &AttrValue) -> Ordering {
    if let (Some(x), Some(y)) = (as_i128(a), as_i128(b)) {
        return x.cmp(&y);
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Exact integer view, so large integers are not compared as rounded floats.
fn as_i128(value: &AttrValue) -> Option<i128> {
    match value {
        AttrValue::Int(v) => Some(i128::from(*v)),
        AttrValue::UInt(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn extreme(values: &[AttrValue], wanted: Ordering) -> AttrValue {
    let mut best = &values[0];
    for value in &values[1..] {
        if compare(value, best) == wanted {
            best = value;
        }
    }
    best.clone()
}

fn unique(values: &[AttrValue]) -> AttrValue {
    let mut seen: Vec<&AttrValue> = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }

    if seen.len() == 1 {
        return seen[0].clone();
    }
    let joined: Vec<String> = seen.iter().map(|v| v.to_string()).collect();
    AttrValue::Text(joined.join(", "))
}
