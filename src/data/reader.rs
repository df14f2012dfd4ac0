//! Dataset reader capability and its NetCDF backend.

use super::{AttrValue, CoordinateValues, NumericType};
use crate::error::{AggregateError, Result};
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;

/// Opens datasets by filename.
///
/// The reader is chosen per run and handed to the aggregation builder, so
/// alternative array formats only need to implement this trait.
pub trait DatasetReader {
    /// Open a dataset. The returned handle releases the underlying resource when dropped.
    fn open(&self, filename: &str) -> Result<Box<dyn OpenDataset + '_>>;
}

/// An open dataset.
pub trait OpenDataset {
    /// Read the units and ascending values of the coordinate variable for `dimension`.
    ///
    /// Fails with [`AggregateError::Coordinates`] when the variable is absent,
    /// is not one-dimensional, or cannot be read as numbers.
    fn read_coordinate(&self, dimension: &str) -> Result<CoordinateValues>;

    /// Read a scalar global attribute.
    ///
    /// Fails with [`AggregateError::AttributeMissing`] when the attribute is absent.
    fn read_attribute(&self, name: &str) -> Result<AttrValue>;
}

/// NetCDF dataset reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfReader;

impl DatasetReader for NetcdfReader {
    fn open(&self, filename: &str) -> Result<Box<dyn OpenDataset + '_>> {
        let file = netcdf::open(filename).map_err(|e| AggregateError::file_open(filename, e))?;
        tracing::debug!("Opened {}", filename);

        Ok(Box::new(NetcdfDataset {
            path: filename.to_string(),
            file,
        }))
    }
}

struct NetcdfDataset {
    path: String,
    file: netcdf::File,
}

impl OpenDataset for NetcdfDataset {
    fn read_coordinate(&self, dimension: &str) -> Result<CoordinateValues> {
        let var = self.file.variable(dimension).ok_or_else(|| {
            AggregateError::coordinates(&self.path, format!("Variable '{}' not found", dimension))
        })?;

        // Aggregation dimension should be one-dimensional
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if shape.len() != 1 {
            return Err(AggregateError::coordinates(
                &self.path,
                format!(
                    "Aggregation dimension must be one-dimensional - shape is {:?}",
                    shape
                ),
            ));
        }

        let (values, numeric_type) =
            read_values(&var).map_err(|reason| AggregateError::coordinates(&self.path, reason))?;
        if values.is_empty() {
            return Err(AggregateError::coordinates(
                &self.path,
                format!("Variable '{}' has no values", dimension),
            ));
        }

        let units = match var.attribute("units") {
            Some(attr) => Some(units_text(&self.path, attr.value())?),
            None => None,
        };

        Ok(CoordinateValues::typed(units, values, numeric_type))
    }

    fn read_attribute(&self, name: &str) -> Result<AttrValue> {
        let attr = self
            .file
            .attribute(name)
            .ok_or_else(|| AggregateError::attribute_missing(name, &self.path))?;

        scalar_value(attr.value()?).ok_or_else(|| AggregateError::UnsupportedAttribute {
            attr: name.to_string(),
            path: self.path.clone(),
        })
    }
}

fn read_values(var: &netcdf::Variable<'_>) -> std::result::Result<(Vec<f64>, NumericType), String> {
    let vartype = var.vartype();

    let values = match vartype {
        NcVariableType::Float(FloatType::F64) => var
            .get_values::<f64, _>(..)
            .map_err(|e| format!("Failed to read f64 data: {}", e))?,
        NcVariableType::Float(FloatType::F32) => {
            let values = var
                .get_values::<f32, _>(..)
                .map_err(|e| format!("Failed to read f32 data: {}", e))?;
            return Ok((values.into_iter().map(f64::from).collect(), NumericType::Float32));
        }
        NcVariableType::Int(IntType::I64) => var
            .get_values::<i64, _>(..)
            .map(|v| v.into_iter().map(|x| x as f64).collect())
            .map_err(|e| format!("Failed to read i64 data: {}", e))?,
        NcVariableType::Int(IntType::I32) => var
            .get_values::<i32, _>(..)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| format!("Failed to read i32 data: {}", e))?,
        NcVariableType::Int(IntType::I16) => var
            .get_values::<i16, _>(..)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| format!("Failed to read i16 data: {}", e))?,
        NcVariableType::Int(IntType::I8) => var
            .get_values::<i8, _>(..)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| format!("Failed to read i8 data: {}", e))?,
        NcVariableType::Int(IntType::U64) => var
            .get_values::<u64, _>(..)
            .map(|v| v.into_iter().map(|x| x as f64).collect())
            .map_err(|e| format!("Failed to read u64 data: {}", e))?,
        NcVariableType::Int(IntType::U32) => var
            .get_values::<u32, _>(..)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| format!("Failed to read u32 data: {}", e))?,
        NcVariableType::Int(IntType::U16) => var
            .get_values::<u16, _>(..)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| format!("Failed to read u16 data: {}", e))?,
        NcVariableType::Int(IntType::U8) => var
            .get_values::<u8, _>(..)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| format!("Failed to read u8 data: {}", e))?,
        _ => return Err(format!("Unsupported coordinate type: {:?}", vartype)),
    };

    let numeric_type = match vartype {
        NcVariableType::Int(_) => NumericType::Integer,
        _ => NumericType::Float64,
    };
    Ok((values, numeric_type))
}

/// Convert a single-valued attribute. Arrays of more than one element are rejected.
fn scalar_value(value: AttributeValue) -> Option<AttrValue> {
    match value {
        AttributeValue::Uchar(v) => Some(v.into()),
        AttributeValue::Schar(v) => Some(v.into()),
        AttributeValue::Ushort(v) => Some(v.into()),
        AttributeValue::Short(v) => Some(v.into()),
        AttributeValue::Uint(v) => Some(v.into()),
        AttributeValue::Int(v) => Some(v.into()),
        AttributeValue::Ulonglong(v) => Some(v.into()),
        AttributeValue::Longlong(v) => Some(v.into()),
        AttributeValue::Float(v) => Some(v.into()),
        AttributeValue::Double(v) => Some(v.into()),
        AttributeValue::Str(v) => Some(v.into()),
        AttributeValue::Strs(v) if v.len() == 1 => v.into_iter().next().map(AttrValue::Text),
        _ => None,
    }
}

/// An unreadable `units` attribute is a coordinate problem of this file only.
fn units_text(path: &str, value: std::result::Result<AttributeValue, netcdf::Error>) -> Result<String> {
    value
        .map(attr_to_string)
        .map_err(|e| AggregateError::coordinates(path, format!("Failed to read units: {}", e)))
}

fn attr_to_string(value: AttributeValue) -> String {
    match value {
        AttributeValue::Str(v) => v,
        AttributeValue::Strs(v) => v.join(", "),
        other => {
            let fallback = format!("{:?}", other);
            scalar_value(other).map_or(fallback, |v| v.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_text() {
        let units = units_text("a.nc", Ok(AttributeValue::Str("days since 1970-01-01".to_string())));
        assert_eq!(units.unwrap(), "days since 1970-01-01");
    }

    #[test]
    fn test_unreadable_units_is_recoverable() {
        let err = units_text("a.nc", Err(netcdf::Error::Str("unknown type".to_string()))).unwrap_err();
        assert!(matches!(err, AggregateError::Coordinates { ref path, .. } if path == "a.nc"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_scalar_value_classification() {
        assert_eq!(scalar_value(AttributeValue::Short(3)), Some(AttrValue::Int(3)));
        assert_eq!(
            scalar_value(AttributeValue::Ulonglong(u64::MAX)),
            Some(AttrValue::UInt(u64::MAX))
        );
        assert_eq!(scalar_value(AttributeValue::Double(2.5)), Some(AttrValue::Float(2.5)));
        assert_eq!(scalar_value(AttributeValue::Ints(vec![1, 2])), None);
    }
}
