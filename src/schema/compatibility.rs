//! Module for handling data type compatibility checks.

use arrow::datatypes::DataType;

use crate::schema::ColumnKind;

/// Types of data type compatibility
#[derive(Debug, PartialEq, Eq)]
pub enum TypeCompatibility {
    /// Types match exactly
    Exact,
    /// Types can be automatically converted
    Compatible,
    /// Types are incompatible
    Incompatible,
}

/// Check whether a stored Arrow type can be read as a column kind
#[must_use]
pub fn check_kind_compatibility(data_type: &DataType, kind: ColumnKind) -> TypeCompatibility {
    match (kind, data_type) {
        (ColumnKind::Text, DataType::Utf8)
        | (ColumnKind::Float, DataType::Float64)
        | (ColumnKind::Integer, DataType::Int64)
        | (ColumnKind::Date, DataType::Date32) => TypeCompatibility::Exact,

        // Everything prints; a text column holding numbers (a year) is fine
        (ColumnKind::Text, _) => TypeCompatibility::Compatible,

        // Numeric widening, and text holding numbers or unknown markers
        (ColumnKind::Float | ColumnKind::Integer, t) if is_numeric(t) || is_string(t) => {
            TypeCompatibility::Compatible
        }
        // A column of nothing but empty cells is inferred as Null
        (_, DataType::Null) => TypeCompatibility::Compatible,

        (ColumnKind::Date | ColumnKind::DateTime, t) if is_temporal(t) || is_string(t) => {
            TypeCompatibility::Compatible
        }

        _ => TypeCompatibility::Incompatible,
    }
}

/// Identifies whether a data type is numeric
#[must_use]
pub const fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

/// Identifies whether a data type is a string type
#[must_use]
pub const fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}

/// Identifies whether a data type is a date or timestamp type
#[must_use]
pub const fn is_temporal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}
