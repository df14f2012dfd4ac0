//! Ordered collection of datasets along the aggregation dimension.

use super::{AttributeAggregator, Interval};
use crate::data::{DatasetReader, NumericType, OpenDataset};
use crate::error::{AggregateError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Whether every file seen so far shares the same coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// All files share one units value; entries are sorted and non-overlapping.
    SingleUnit,
    /// A second distinct units value was seen. Terminal.
    MultiUnit,
}

/// What a [`Diagnostic`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A file was left out of the aggregation because of its coordinate variable.
    SkippedFile,
    /// A file had no usable value for an aggregated attribute.
    MissingAttribute,
    /// An aggregated attribute received no values and was not written.
    EmptyAggregator,
}

/// A non-fatal problem met while building an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Kind of problem.
    pub kind: DiagnosticKind,
    /// File concerned, if any.
    pub filename: Option<String>,
    /// Human readable description.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(kind: DiagnosticKind, filename: Option<&str>, err: &AggregateError) -> Self {
        tracing::warn!("{}", err);
        Self {
            kind,
            filename: filename.map(str::to_string),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WARNING: {}", self.message)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    interval: Option<Interval>,
    numeric_type: NumericType,
    filename: String,
}

impl Entry {
    /// Sort key comparison against a new `(interval, filename)` pair.
    fn cmp_key(&self, interval: &Interval, filename: &str) -> Ordering {
        match &self.interval {
            Some(own) => own
                .cmp_lower(interval)
                .then_with(|| self.filename.as_str().cmp(filename)),
            None => Ordering::Less,
        }
    }
}

/// One file of a finished collection.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Filename as given to [`DatasetCollection::add`].
    pub filename: String,
    /// Coordinate values, omitted when the collection saw multiple units.
    pub values: Option<Vec<f64>>,
    /// Type the coordinate values were stored as in the file.
    pub numeric_type: NumericType,
}

impl OutputRecord {
    /// A record without coordinate values.
    pub fn uncached(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            values: None,
            numeric_type: NumericType::default(),
        }
    }

    /// Comma separated coordinate values as written to `coordValue`.
    pub fn coord_value(&self) -> Option<String> {
        let values = self.values.as_ref()?;
        let text: Vec<String> = values.iter().map(|v| self.numeric_type.format(*v)).collect();
        Some(text.join(","))
    }
}

/// Result of consuming a [`DatasetCollection`].
#[derive(Debug)]
pub struct FinishedCollection {
    /// Records in final order.
    pub records: Vec<OutputRecord>,
    /// Whether more than one units value was seen.
    pub multiple_units: bool,
    /// Attribute aggregators with their contributions.
    pub aggregators: Vec<AttributeAggregator>,
    /// Diagnostics in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Datasets sorted by their coordinate values.
///
/// While all files share one units value the entries are kept sorted by lower
/// bound (then filename) and adjacent entries may not overlap. Once a second
/// units value turns up the order no longer means anything, so later files are
/// appended as they arrive and their coordinates are not kept.
pub struct DatasetCollection<'r> {
    dimension: String,
    reader: &'r dyn DatasetReader,
    aggregators: Vec<AttributeAggregator>,
    entries: Vec<Entry>,
    first_units: Option<Option<String>>,
    state: UnitState,
    diagnostics: Vec<Diagnostic>,
}

impl fmt::Debug for DatasetCollection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCollection")
            .field("dimension", &self.dimension)
            .field("entries", &self.entries)
            .field("state", &self.state)
            .field("aggregators", &self.aggregators)
            .finish_non_exhaustive()
    }
}

impl<'r> DatasetCollection<'r> {
    /// Create an empty collection reading `dimension` through `reader`.
    pub fn new(
        dimension: impl Into<String>,
        reader: &'r dyn DatasetReader,
        aggregators: Vec<AttributeAggregator>,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            reader,
            aggregators,
            entries: Vec::new(),
            first_units: None,
            state: UnitState::SingleUnit,
            diagnostics: Vec::new(),
        }
    }

    /// Number of files in the collection.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current unit state.
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Whether more than one units value has been seen.
    pub fn multiple_units(&self) -> bool {
        self.state == UnitState::MultiUnit
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Filenames and stored coordinate values in current order.
    pub fn datasets(&self) -> impl Iterator<Item = (&str, Option<&[f64]>)> + '_ {
        self.entries
            .iter()
            .map(|e| (e.filename.as_str(), e.interval.as_ref().map(Interval::values)))
    }

    /// Add a file.
    ///
    /// Files whose coordinate variable is unusable are skipped with a
    /// diagnostic, as are missing attribute values. Fails with
    /// [`AggregateError::OverlappingUnits`] when the file's coordinates
    /// overlap a neighbour sharing the same units.
    pub fn add(&mut self, filename: &str) -> Result<()> {
        let reader = self.reader;
        let mut contributed = false;

        loop {
            if self.state == UnitState::MultiUnit && self.aggregators.is_empty() {
                self.push_unsorted(filename);
                return Ok(());
            }

            let coords = {
                let dataset = reader.open(filename)?;
                let coords = match dataset.read_coordinate(&self.dimension) {
                    Ok(coords) => coords,
                    Err(err) if err.is_recoverable() => {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::SkippedFile,
                            Some(filename),
                            &err,
                        ));
                        return Ok(());
                    }
                    Err(err) => return Err(err),
                };

                // The unit transition re-reads the file; aggregators only count it once
                if !contributed {
                    self.contribute(&*dataset, filename)?;
                    contributed = true;
                }
                coords
            };

            if self.state == UnitState::MultiUnit {
                self.push_unsorted(filename);
                return Ok(());
            }

            if self.observe_units(coords.units) {
                continue;
            }

            let Some(interval) = Interval::new(coords.values) else {
                let err = AggregateError::coordinates(filename, "Coordinate variable has no values");
                self.diagnostics
                    .push(Diagnostic::new(DiagnosticKind::SkippedFile, Some(filename), &err));
                return Ok(());
            };
            return self.insert_sorted(interval, coords.numeric_type, filename);
        }
    }

    /// Consume the collection.
    pub fn finish(self) -> FinishedCollection {
        let multiple_units = self.multiple_units();
        let records = self
            .entries
            .into_iter()
            .map(|entry| OutputRecord {
                filename: entry.filename,
                values: if multiple_units {
                    None
                } else {
                    entry.interval.map(Interval::into_values)
                },
                numeric_type: entry.numeric_type,
            })
            .collect();

        FinishedCollection {
            records,
            multiple_units,
            aggregators: self.aggregators,
            diagnostics: self.diagnostics,
        }
    }

    fn contribute(&mut self, dataset: &dyn OpenDataset, filename: &str) -> Result<()> {
        for agg in &mut self.aggregators {
            match dataset.read_attribute(agg.name()) {
                Ok(value) => agg.add(value),
                Err(err) if err.is_recoverable() => {
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::MissingAttribute,
                        Some(filename),
                        &err,
                    ));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Record the units of a file. Returns true when this causes the switch to
    /// [`UnitState::MultiUnit`].
    fn observe_units(&mut self, units: Option<String>) -> bool {
        match &self.first_units {
            None => {
                self.first_units = Some(units);
                false
            }
            Some(seen) if *seen == units => false,
            Some(seen) => {
                tracing::info!(
                    "Found units {:?} after {:?}; coordinate values will not be cached",
                    units,
                    seen
                );
                self.state = UnitState::MultiUnit;
                true
            }
        }
    }

    fn push_unsorted(&mut self, filename: &str) {
        tracing::debug!("Appending {} without coordinates", filename);
        self.entries.push(Entry {
            interval: None,
            numeric_type: NumericType::default(),
            filename: filename.to_string(),
        });
    }

    fn insert_sorted(&mut self, interval: Interval, numeric_type: NumericType, filename: &str) -> Result<()> {
        let idx = self
            .entries
            .partition_point(|e| e.cmp_key(&interval, filename) != Ordering::Greater);

        // Entries are sorted and disjoint, so only the neighbours can overlap
        let before = idx.checked_sub(1).map(|i| &self.entries[i]);
        let after = self.entries.get(idx);
        for neighbour in before.into_iter().chain(after) {
            if let Some(existing) = &neighbour.interval {
                if existing.overlaps(&interval) {
                    return Err(AggregateError::OverlappingUnits {
                        existing: neighbour.filename.clone(),
                        added: filename.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            "Inserting {} [{}, {}] at position {}",
            filename,
            interval.lower(),
            interval.upper(),
            idx
        );
        self.entries.insert(
            idx,
            Entry {
                interval: Some(interval),
                numeric_type,
                filename: filename.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::StockReducer;
    use crate::data::{AttrValue, MemoryDataset, MemoryReader};

    const DAYS: Option<&str> = Some("days since 1970-01-01");

    fn reader(files: &[(&str, &[f64], Option<&str>)]) -> MemoryReader {
        files.iter().fold(MemoryReader::new(), |reader, (name, values, units)| {
            reader.with_dataset(name, MemoryDataset::new().with_coordinate("time", values, *units))
        })
    }

    fn filenames(collection: &DatasetCollection<'_>) -> Vec<String> {
        collection.datasets().map(|(f, _)| f.to_string()).collect()
    }

    #[test]
    fn test_sorted_by_lower_bound() {
        let reader = reader(&[
            ("c.nc", &[50.0, 60.0], DAYS),
            ("a.nc", &[10.0], DAYS),
            ("b.nc", &[20.0, 30.0], DAYS),
        ]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        for f in ["c.nc", "a.nc", "b.nc"] {
            collection.add(f).unwrap();
        }

        assert_eq!(filenames(&collection), vec!["a.nc", "b.nc", "c.nc"]);
        assert_eq!(collection.state(), UnitState::SingleUnit);
        let stored: Vec<Option<&[f64]>> = collection.datasets().map(|(_, v)| v).collect();
        assert_eq!(stored[1], Some(&[20.0, 30.0][..]));
    }

    #[test]
    fn test_overlap_is_fatal() {
        let reader = reader(&[("a.nc", &[10.0, 20.0, 30.0], DAYS), ("b.nc", &[15.0, 16.0], DAYS)]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        collection.add("a.nc").unwrap();
        let err = collection.add("b.nc").unwrap_err();
        assert!(matches!(err, AggregateError::OverlappingUnits { .. }));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_identical_single_values_overlap() {
        let reader = reader(&[("a.nc", &[1234.0], DAYS), ("b.nc", &[1234.0], DAYS)]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        collection.add("a.nc").unwrap();
        assert!(matches!(
            collection.add("b.nc"),
            Err(AggregateError::OverlappingUnits { .. })
        ));
    }

    #[test]
    fn test_duplicate_filename_overlaps_itself() {
        let reader = reader(&[("a.nc", &[1.0, 2.0], DAYS)]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        collection.add("a.nc").unwrap();
        assert!(collection.add("a.nc").is_err());
    }

    #[test]
    fn test_nested_interval_is_caught() {
        // A wide span followed by files that sit inside it, added in every order
        let files: [(&str, &[f64], Option<&str>); 3] = [
            ("wide.nc", &[0.0, 100.0], DAYS),
            ("inner.nc", &[10.0, 20.0], DAYS),
            ("later.nc", &[30.0, 40.0], DAYS),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let reader = reader(&files);
            let mut collection = DatasetCollection::new("time", &reader, Vec::new());
            let result: Result<()> = order.iter().try_for_each(|&i| collection.add(files[i].0));
            assert!(
                matches!(result, Err(AggregateError::OverlappingUnits { .. })),
                "order {:?} was accepted",
                order
            );
        }
    }

    #[test]
    fn test_touching_bounds_overlap() {
        let reader = reader(&[("a.nc", &[1.0, 5.0], DAYS), ("b.nc", &[5.0, 9.0], DAYS)]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        collection.add("b.nc").unwrap();
        assert!(collection.add("a.nc").is_err());
    }

    #[test]
    fn test_bad_coordinates_skipped() {
        let reader = MemoryReader::new()
            .with_dataset("good.nc", MemoryDataset::new().with_coordinate("time", &[1.0], DAYS))
            .with_dataset("none.nc", MemoryDataset::new().with_coordinate("lat", &[1.0], None))
            .with_dataset(
                "grid.nc",
                MemoryDataset::new().with_variable("time", vec![1, 2], &[5.0, 6.0], DAYS),
            );
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        for f in ["none.nc", "good.nc", "grid.nc"] {
            collection.add(f).unwrap();
        }

        assert_eq!(filenames(&collection), vec!["good.nc"]);
        let skipped: Vec<_> = collection
            .diagnostics()
            .iter()
            .map(|d| (d.kind, d.filename.as_deref()))
            .collect();
        assert_eq!(
            skipped,
            vec![
                (DiagnosticKind::SkippedFile, Some("none.nc")),
                (DiagnosticKind::SkippedFile, Some("grid.nc")),
            ]
        );
        assert_eq!(reader.open_handles(), 0);
    }

    #[test]
    fn test_unopenable_file_is_fatal() {
        let reader = reader(&[("a.nc", &[1.0], DAYS)]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        assert!(matches!(
            collection.add("missing.nc"),
            Err(AggregateError::FileOpen { .. })
        ));
    }

    #[test]
    fn test_unit_transition() {
        let reader = reader(&[
            ("a.nc", &[5.0], Some("days since 1970-01-01")),
            ("b.nc", &[0.0], Some("days since 1970-01-02")),
            ("c.nc", &[0.0], Some("days since 1970-01-03")),
        ]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        collection.add("a.nc").unwrap();
        assert_eq!(collection.state(), UnitState::SingleUnit);
        collection.add("b.nc").unwrap();
        assert_eq!(collection.state(), UnitState::MultiUnit);
        collection.add("c.nc").unwrap();

        // a keeps its interval, later files are appended in arrival order
        let stored: Vec<(&str, bool)> = collection.datasets().map(|(f, v)| (f, v.is_some())).collect();
        assert_eq!(stored, vec![("a.nc", true), ("b.nc", false), ("c.nc", false)]);

        // Without aggregators the fast path never opens c.nc
        assert_eq!(reader.opened(), vec!["a.nc", "b.nc"]);

        let finished = collection.finish();
        assert!(finished.multiple_units);
        assert!(finished.records.iter().all(|r| r.values.is_none()));
    }

    #[test]
    fn test_missing_units_count_as_distinct() {
        let reader = reader(&[("a.nc", &[1.0], None), ("b.nc", &[2.0], DAYS)]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        collection.add("a.nc").unwrap();
        collection.add("b.nc").unwrap();
        assert!(collection.multiple_units());
    }

    #[test]
    fn test_overlap_ignored_after_transition() {
        let reader = reader(&[
            ("a.nc", &[1.0], Some("days")),
            ("b.nc", &[1.0], Some("hours")),
            ("c.nc", &[1.0], Some("days")),
        ]);
        let mut collection = DatasetCollection::new("time", &reader, Vec::new());
        for f in ["a.nc", "b.nc", "c.nc"] {
            collection.add(f).unwrap();
        }
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_aggregators_fed_once_across_transition() {
        let reader = MemoryReader::new()
            .with_dataset(
                "a.nc",
                MemoryDataset::new()
                    .with_coordinate("time", &[1.0], Some("days"))
                    .with_attribute("id", 1i32),
            )
            .with_dataset(
                "b.nc",
                MemoryDataset::new()
                    .with_coordinate("time", &[1.0], Some("hours"))
                    .with_attribute("id", 2i32),
            )
            .with_dataset(
                "c.nc",
                MemoryDataset::new().with_coordinate("time", &[9.0], Some("days")),
            );
        let aggs = vec![AttributeAggregator::stock("id", StockReducer::Max)];
        let mut collection = DatasetCollection::new("time", &reader, aggs);
        for f in ["a.nc", "b.nc", "c.nc"] {
            collection.add(f).unwrap();
        }

        // b.nc is read twice (before and after the transition), c.nc is opened for its attribute
        assert_eq!(reader.opened(), vec!["a.nc", "b.nc", "b.nc", "c.nc"]);
        assert_eq!(reader.peak_open_handles(), 1);

        let finished = collection.finish();
        assert_eq!(
            finished.aggregators[0].contributions(),
            &[AttrValue::Int(1), AttrValue::Int(2)]
        );
        assert_eq!(finished.diagnostics.len(), 1);
        assert_eq!(finished.diagnostics[0].kind, DiagnosticKind::MissingAttribute);
        assert_eq!(finished.diagnostics[0].filename.as_deref(), Some("c.nc"));
    }

    #[test]
    fn test_skipped_file_does_not_contribute() {
        let reader = MemoryReader::new().with_dataset(
            "a.nc",
            MemoryDataset::new().with_attribute("id", 1i32),
        );
        let aggs = vec![AttributeAggregator::stock("id", StockReducer::First)];
        let mut collection = DatasetCollection::new("time", &reader, aggs);
        collection.add("a.nc").unwrap();

        assert!(collection.is_empty());
        let finished = collection.finish();
        assert!(finished.aggregators[0].contributions().is_empty());
    }
}
