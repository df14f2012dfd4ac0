//! Values read from datasets.

use std::fmt;

/// Storage type of a coordinate variable, which decides how its values are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericType {
    /// Any integer type. Written without a fractional part.
    Integer,
    /// Single precision. Written with the shortest text that reads back as the same `f32`.
    Float32,
    /// Double precision.
    #[default]
    Float64,
}

impl NumericType {
    /// Format a value stored with this type.
    pub fn format(self, value: f64) -> String {
        match self {
            // Integral f64 values print exactly with no decimals
            NumericType::Integer if value.is_finite() => format!("{:.0}", value),
            NumericType::Float32 => format_number_f32(value as f32),
            _ => format_number(value),
        }
    }
}

/// Coordinate values of one file along the aggregation dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateValues {
    /// Units attribute of the coordinate variable, `None` when the variable has none.
    pub units: Option<String>,
    /// Coordinate values, sorted ascending.
    pub values: Vec<f64>,
    /// Type the values were stored as.
    pub numeric_type: NumericType,
}

impl CoordinateValues {
    /// Create double precision coordinate values, sorting them ascending.
    pub fn new(units: Option<String>, values: Vec<f64>) -> Self {
        Self::typed(units, values, NumericType::Float64)
    }

    /// Create coordinate values stored as `numeric_type`, sorting them ascending.
    pub fn typed(units: Option<String>, mut values: Vec<f64>, numeric_type: NumericType) -> Self {
        values.sort_by(f64::total_cmp);
        Self {
            units,
            values,
            numeric_type,
        }
    }
}

/// A scalar attribute value.
///
/// Integers and reals are kept apart so that the NcML `type` marker can be
/// derived from the value itself, whatever primitive it originally came from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integral number.
    Int(i64),
    /// Unsigned integral number too large for [`AttrValue::Int`].
    UInt(u64),
    /// Real number.
    Float(f64),
    /// Text.
    Text(String),
}

impl AttrValue {
    /// NcML `type` attribute for this value, `None` for text.
    pub fn type_marker(&self) -> Option<&'static str> {
        match self {
            AttrValue::Int(_) | AttrValue::UInt(_) => Some("int"),
            AttrValue::Float(_) => Some("float"),
            AttrValue::Text(_) => None,
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::UInt(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Text(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::UInt(v) => write!(f, "{}", v),
            AttrValue::Float(v) => f.write_str(&format_number(*v)),
            AttrValue::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! int_attr_value {
    ($($t:ty),*) => {
        $(impl From<$t> for AttrValue {
            fn from(v: $t) -> Self {
                AttrValue::Int(i64::from(v))
            }
        })*
    };
}

int_attr_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(AttrValue::UInt(v), AttrValue::Int)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::Float(f64::from(v))
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// Format a number as the shortest decimal text that reads back to the same value.
///
/// Integral values keep a trailing `.0`; very large or small magnitudes use an
/// exponent with an explicit sign and at least two digits (`1e+16`, `1.5e-07`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    normalize_exponent(format!("{:?}", value))
}

/// [`format_number`] for single precision values.
///
/// `15.1f32` is written as `15.1`, not as the digits of its `f64` widening.
pub fn format_number_f32(value: f32) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    normalize_exponent(format!("{:?}", value))
}

fn normalize_exponent(text: String) -> String {
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_plain() {
        assert_eq!(format_number(10.0), "10.0");
        assert_eq!(format_number(1234.0), "1234.0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(format_number(0.1), "0.1");
    }

    #[test]
    fn test_format_number_exponent() {
        assert_eq!(format_number(1e16), "1e+16");
        assert_eq!(format_number(1.5e-7), "1.5e-07");
        assert_eq!(format_number(2.5e120), "2.5e+120");
    }

    #[test]
    fn test_format_number_non_finite() {
        assert_eq!(format_number(f64::NAN), "nan");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_attr_value_classification() {
        assert_eq!(AttrValue::from(3u8).type_marker(), Some("int"));
        assert_eq!(AttrValue::from(-7i64).type_marker(), Some("int"));
        assert_eq!(AttrValue::from(1.5f32).type_marker(), Some("float"));
        assert_eq!(AttrValue::from(2.0f64).type_marker(), Some("float"));
        assert_eq!(AttrValue::from("text").type_marker(), None);
        assert_eq!(AttrValue::from(u64::MAX).type_marker(), Some("int"));
        assert_eq!(AttrValue::from(7u64), AttrValue::Int(7));
    }

    #[test]
    fn test_large_unsigned_keeps_digits() {
        let value = AttrValue::from(u64::MAX);
        assert_eq!(value, AttrValue::UInt(u64::MAX));
        assert_eq!(value.to_string(), "18446744073709551615");
    }

    #[test]
    fn test_format_number_f32() {
        assert_eq!(format_number_f32(15.1), "15.1");
        assert_eq!(format_number_f32(0.1), "0.1");
        assert_eq!(format_number_f32(10.0), "10.0");
        assert_eq!(format_number_f32(1e16), "1e+16");
        assert_eq!(format_number_f32(f32::NAN), "nan");
    }

    #[test]
    fn test_numeric_type_format() {
        assert_eq!(NumericType::Integer.format(10.0), "10");
        assert_eq!(NumericType::Integer.format(-3.0), "-3");
        assert_eq!(NumericType::Float32.format(f64::from(15.1f32)), "15.1");
        assert_eq!(NumericType::Float64.format(f64::from(15.1f32)), "15.100000381469727");
        assert_eq!(NumericType::Float64.format(10.0), "10.0");
    }

    #[test]
    fn test_attr_value_display() {
        assert_eq!(AttrValue::Int(42).to_string(), "42");
        assert_eq!(AttrValue::Float(2.0).to_string(), "2.0");
        assert_eq!(AttrValue::from("hello").to_string(), "hello");
    }

    #[test]
    fn test_coordinate_values_sorted() {
        let coords = CoordinateValues::new(None, vec![3.0, 1.0, 2.0]);
        assert_eq!(coords.values, vec![1.0, 2.0, 3.0]);
        assert!(coords.units.is_none());
        assert_eq!(coords.numeric_type, NumericType::Float64);
    }
}
