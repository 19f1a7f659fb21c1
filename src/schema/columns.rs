//! Typed, name-based column access for Arrow record batches
//!
//! A column is looked up once per batch and adapted to the type the caller
//! wants: anything can be read as text, and numeric or text columns can be
//! read as floats. Text cells holding an unknown marker ("", "NA", "unknown")
//! read as `None`.

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{PipelineError, Result};
use crate::schema::compatibility::{is_numeric, is_string};

/// Cell values that mean "not measured"
const UNKNOWN_MARKERS: [&str; 9] = ["", "na", "n/a", "nan", "null", "none", "unknown", "inconnu", "-"];

/// Whether a text cell stands for a missing value
#[must_use]
pub fn is_unknown_marker(s: &str) -> bool {
    let s = s.trim();
    UNKNOWN_MARKERS.iter().any(|marker| marker.eq_ignore_ascii_case(s))
}

fn column_by_name(batch: &RecordBatch, column_name: &str) -> Result<ArrayRef> {
    let idx = batch
        .schema()
        .index_of(column_name)
        .map_err(|_| PipelineError::ColumnNotFound {
            column: column_name.to_string(),
        })?;
    Ok(batch.column(idx).clone())
}

fn cast_column(column: &ArrayRef, column_name: &str, target: &DataType) -> Result<ArrayRef> {
    if column.data_type() == target {
        return Ok(column.clone());
    }
    debug!(
        "Converting column '{column_name}' from {:?} to {target:?}",
        column.data_type()
    );
    Ok(cast(column, target)?)
}

fn downcast<A: Array + Clone + 'static>(array: &ArrayRef, column_name: &str, expected: &str) -> Result<A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .cloned()
        .ok_or_else(|| PipelineError::InvalidDataType {
            column: column_name.to_string(),
            expected: expected.to_string(),
        })
}

/// A column read as text
#[derive(Debug, Clone)]
pub struct TextColumn {
    values: StringArray,
}

impl TextColumn {
    pub fn from_batch(batch: &RecordBatch, column_name: &str) -> Result<Self> {
        let column = column_by_name(batch, column_name)?;
        let column = cast_column(&column, column_name, &DataType::Utf8)?;
        Ok(Self {
            values: downcast::<StringArray>(&column, column_name, "StringArray")?,
        })
    }

    /// Trimmed cell value, `None` for null or blank cells
    #[must_use]
    pub fn value(&self, row: usize) -> Option<&str> {
        if row >= self.values.len() || self.values.is_null(row) {
            return None;
        }
        let value = self.values.value(row).trim();
        (!value.is_empty()).then_some(value)
    }
}

/// A column read as floating-point measurements
#[derive(Debug, Clone)]
pub enum FloatColumn {
    /// Stored as numbers
    Numeric(Float64Array),
    /// Stored as text, parsed per cell
    Text(StringArray),
}

impl FloatColumn {
    pub fn from_batch(batch: &RecordBatch, column_name: &str) -> Result<Self> {
        let column = column_by_name(batch, column_name)?;
        let data_type = column.data_type().clone();

        if is_numeric(&data_type) || data_type == DataType::Null {
            let column = cast_column(&column, column_name, &DataType::Float64)?;
            Ok(Self::Numeric(downcast::<Float64Array>(&column, column_name, "Float64Array")?))
        } else if is_string(&data_type) {
            let column = cast_column(&column, column_name, &DataType::Utf8)?;
            Ok(Self::Text(downcast::<StringArray>(&column, column_name, "StringArray")?))
        } else {
            Err(PipelineError::InvalidDataType {
                column: column_name.to_string(),
                expected: "numeric or text".to_string(),
            })
        }
    }

    /// Cell value: `Ok(None)` when unknown, `Err` with a description when the
    /// cell holds something that is neither a number nor an unknown marker
    pub fn value(&self, row: usize) -> std::result::Result<Option<f64>, String> {
        match self {
            Self::Numeric(values) => {
                if row >= values.len() || values.is_null(row) {
                    return Ok(None);
                }
                let value = values.value(row);
                Ok((!value.is_nan()).then_some(value))
            }
            Self::Text(values) => {
                if row >= values.len() || values.is_null(row) {
                    return Ok(None);
                }
                let raw = values.value(row).trim();
                if is_unknown_marker(raw) {
                    return Ok(None);
                }
                // French exports use a decimal comma
                match raw.replace(',', ".").parse::<f64>() {
                    Ok(value) if value.is_nan() => Ok(None),
                    Ok(value) => Ok(Some(value)),
                    Err(_) => Err(format!("'{raw}' is not a number")),
                }
            }
        }
    }
}
