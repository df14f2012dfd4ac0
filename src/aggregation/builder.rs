//! NcML aggregation assembly.

use super::{AttributeAggregator, DatasetCollection, Diagnostic, DiagnosticKind, OutputRecord};
use crate::data::{AttrValue, DatasetReader, NetcdfReader};
use crate::error::{AggregateError, Result};
use crate::ncml::{Element, NCML_NAMESPACE};
use std::fmt;
use std::str::FromStr;

/// Aggregation types defined by the NcML schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationType {
    /// Join along a new dimension.
    JoinNew,
    /// Join along an existing dimension shared by every file.
    #[default]
    JoinExisting,
    /// Tile files along several dimensions.
    Tiled,
    /// Union of the variables of every file.
    Union,
}

impl AggregationType {
    /// Name used in the `type` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationType::JoinNew => "joinNew",
            AggregationType::JoinExisting => "joinExisting",
            AggregationType::Tiled => "tiled",
            AggregationType::Union => "union",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationType {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "joinNew" => Ok(AggregationType::JoinNew),
            "joinExisting" => Ok(AggregationType::JoinExisting),
            "tiled" => Ok(AggregationType::Tiled),
            "union" => Ok(AggregationType::Union),
            other => Err(AggregateError::InvalidArgument(format!(
                "Unknown aggregation type '{}'",
                other
            ))),
        }
    }
}

/// A `<variable>` element to declare in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct NcmlVariable {
    /// Variable name.
    pub name: String,
    /// Data type, e.g. `int`.
    pub var_type: String,
    /// Space separated dimension names, empty for a scalar.
    pub shape: String,
    /// Child `<attribute>` elements as name/value pairs.
    pub attrs: Vec<(String, String)>,
}

impl NcmlVariable {
    /// Create a variable declaration without attributes.
    pub fn new(name: impl Into<String>, var_type: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: var_type.into(),
            shape: shape.into(),
            attrs: Vec::new(),
        }
    }

    /// Add a child attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new("variable")
            .with_attr("name", &self.name)
            .with_attr("shape", &self.shape)
            .with_attr("type", &self.var_type);
        for (name, value) in &self.attrs {
            element.push(
                Element::new("attribute")
                    .with_attr("name", name)
                    .with_attr("value", value),
            );
        }
        element
    }
}

/// Options for a single [`AggregationBuilder::build`] call.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Open every file and record its coordinate values in the document.
    pub cache: bool,
    /// Literal global attributes, in insertion order with unique names.
    pub global_attrs: Vec<(String, AttrValue)>,
    /// Global attributes computed from the files. Each build starts from empty copies.
    pub attribute_aggregators: Vec<AttributeAggregator>,
    /// Extra `<variable>` declarations.
    pub extra_variables: Vec<NcmlVariable>,
    /// Global attributes to remove from the aggregated dataset.
    pub remove_attrs: Vec<String>,
}

impl BuildOptions {
    /// Default options: no caching, no extra attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether coordinate values are cached.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set a literal global attribute.
    ///
    /// Setting a name again replaces its value and keeps its original position.
    pub fn global_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let (name, value) = (name.into(), value.into());
        match self.global_attrs.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.global_attrs.push((name, value)),
        }
        self
    }

    /// Add an attribute aggregator.
    pub fn aggregate_attr(mut self, aggregator: AttributeAggregator) -> Self {
        self.attribute_aggregators.push(aggregator);
        self
    }

    /// Declare an extra variable.
    pub fn extra_variable(mut self, variable: NcmlVariable) -> Self {
        self.extra_variables.push(variable);
        self
    }

    /// Remove a global attribute.
    pub fn remove_attr(mut self, name: impl Into<String>) -> Self {
        self.remove_attrs.push(name.into());
        self
    }
}

/// The document produced by a build and the warnings met along the way.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Root `<netcdf>` element.
    pub document: Element,
    /// Non-fatal problems, in the order they happened.
    pub diagnostics: Vec<Diagnostic>,
}

type PostProcess = Box<dyn Fn(Element) -> Element + Send + Sync>;

/// Builds NcML aggregations along one dimension.
///
/// # Example
///
/// ```no_run
/// use ncagg::aggregation::{AggregationBuilder, BuildOptions};
///
/// let builder = AggregationBuilder::netcdf("time");
/// let output = builder.build(&["a.nc", "b.nc"], &BuildOptions::new().cache(true))?;
/// println!("{}", ncagg::ncml::to_xml_string(&output.document)?);
/// # Ok::<(), ncagg::AggregateError>(())
/// ```
pub struct AggregationBuilder<R = NetcdfReader> {
    dimension: String,
    aggregation_type: AggregationType,
    reader: R,
    post_process: Option<PostProcess>,
}

impl<R: fmt::Debug> fmt::Debug for AggregationBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationBuilder")
            .field("dimension", &self.dimension)
            .field("aggregation_type", &self.aggregation_type)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

impl AggregationBuilder<NetcdfReader> {
    /// A `joinExisting` builder reading NetCDF files.
    pub fn netcdf(dimension: impl Into<String>) -> Self {
        Self::new(dimension, NetcdfReader)
    }
}

impl<R: DatasetReader> AggregationBuilder<R> {
    /// A `joinExisting` builder reading files through `reader`.
    pub fn new(dimension: impl Into<String>, reader: R) -> Self {
        Self {
            dimension: dimension.into(),
            aggregation_type: AggregationType::default(),
            reader,
            post_process: None,
        }
    }

    /// Set the aggregation type written to the document.
    pub fn with_type(mut self, aggregation_type: AggregationType) -> Self {
        self.aggregation_type = aggregation_type;
        self
    }

    /// Rewrite the root element after it has been assembled.
    pub fn with_post_process<F>(mut self, f: F) -> Self
    where
        F: Fn(Element) -> Element + Send + Sync + 'static,
    {
        self.post_process = Some(Box::new(f));
        self
    }

    /// Aggregation dimension.
    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// The dataset reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Build the aggregation document for `file_list`.
    ///
    /// Without caching or attribute aggregators no file is opened and the
    /// files appear in the order given. Otherwise every file is read once and
    /// the files are ordered by coordinate value.
    pub fn build<S: AsRef<str>>(&self, file_list: &[S], options: &BuildOptions) -> Result<BuildOutput> {
        let mut diagnostics = Vec::new();
        let mut aggregated = Vec::new();
        let mut multiple_units = false;

        let records = if !options.cache && options.attribute_aggregators.is_empty() {
            file_list
                .iter()
                .map(|f| OutputRecord::uncached(f.as_ref()))
                .collect()
        } else {
            let aggregators = options
                .attribute_aggregators
                .iter()
                .map(AttributeAggregator::fresh)
                .collect();
            let mut collection = DatasetCollection::new(self.dimension.as_str(), &self.reader, aggregators);
            for filename in file_list {
                collection.add(filename.as_ref())?;
            }

            if collection.is_empty() {
                return Err(AggregateError::NoAggregation);
            }

            let finished = collection.finish();
            diagnostics = finished.diagnostics;
            multiple_units = finished.multiple_units;

            for agg in &finished.aggregators {
                match agg.value() {
                    Ok(value) => aggregated.push((agg.name().to_string(), value)),
                    Err(err) => diagnostics.push(Diagnostic::new(DiagnosticKind::EmptyAggregator, None, &err)),
                }
            }
            finished.records
        };

        tracing::info!(
            "Aggregated {} of {} files along '{}'",
            records.len(),
            file_list.len(),
            self.dimension
        );

        let mut root = self.assemble(options, &aggregated, records, multiple_units);
        if let Some(post_process) = &self.post_process {
            root = post_process(root);
        }

        Ok(BuildOutput {
            document: root,
            diagnostics,
        })
    }

    fn assemble(
        &self,
        options: &BuildOptions,
        aggregated: &[(String, AttrValue)],
        records: Vec<OutputRecord>,
        multiple_units: bool,
    ) -> Element {
        let mut root = Element::new("netcdf").with_attr("xmlns", NCML_NAMESPACE);

        // Directives are placed at the head of their block, so the last one given comes first
        for name in options.remove_attrs.iter().rev() {
            root.push(
                Element::new("remove")
                    .with_attr("name", name)
                    .with_attr("type", "attribute"),
            );
        }

        // Global attributes go to the head of their block, so the last one added comes first
        let globals = options.global_attrs.iter().chain(aggregated);
        let mut attributes: Vec<Element> = globals.map(|(name, value)| attribute_element(name, value)).collect();
        attributes.reverse();
        root.children.extend(attributes);

        for var in &options.extra_variables {
            root.push(var.to_element());
        }

        let mut aggregation = Element::new("aggregation")
            .with_attr("dimName", &self.dimension)
            .with_attr("type", self.aggregation_type.as_str());
        if multiple_units && self.dimension == "time" {
            aggregation.set_attr("timeUnitsChange", "true");
        }

        for record in records {
            let mut netcdf = Element::new("netcdf").with_attr("location", &record.filename);
            if let Some(coord_value) = record.coord_value().filter(|_| !multiple_units) {
                netcdf.set_attr("coordValue", coord_value);
            }
            aggregation.push(netcdf);
        }

        root.push(aggregation);
        root
    }
}

fn attribute_element(name: &str, value: &AttrValue) -> Element {
    let mut element = Element::new("attribute")
        .with_attr("name", name)
        .with_attr("value", value.to_string());
    if let Some(marker) = value.type_marker() {
        element.set_attr("type", marker);
    }
    element
}
