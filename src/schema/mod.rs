//! Column contracts for persisted tables.
//!
//! Row types derive `TabularSchema` (see `onehealth-macros`) to declare the
//! columns they need. Before a table is read, its header is checked against
//! that contract and every problem is collected in a
//! `SchemaCompatibilityReport`; a report with a missing required column turns
//! into a `SchemaError` for the whole load.

use arrow::datatypes::Schema;

use crate::error::{PipelineError, Result};

pub mod columns;
pub mod compatibility;

pub use columns::{FloatColumn, TextColumn, is_unknown_marker};
pub use compatibility::{TypeCompatibility, check_kind_compatibility};

/// Logical kind of a column, independent of how a file happens to encode it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Float,
    Integer,
    Date,
    DateTime,
}

/// One column in a table contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Header name on disk
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Whether the column must be present in the header
    pub required: bool,
}

/// Column contract of a row type, usually derived
pub trait TabularSchema {
    /// Human-readable table name for error messages
    const TABLE_NAME: &'static str;
    /// Columns in declaration order
    const COLUMNS: &'static [ColumnSpec];
}

/// Result of checking a table header against a contract
#[derive(Debug, Default)]
pub struct SchemaCompatibilityReport {
    /// Whether the table can be read
    pub compatible: bool,
    /// Problems found, including non-fatal ones
    pub issues: Vec<SchemaIssue>,
}

/// A schema compatibility issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Column the issue is about
    pub column: String,
    /// Whether the issue prevents reading the table
    pub fatal: bool,
    /// Description of the incompatibility
    pub description: String,
}

impl SchemaCompatibilityReport {
    /// Turn a failed report into a `SchemaError` naming every fatal issue
    pub fn into_result(self, source_name: &str) -> Result<()> {
        if self.compatible {
            for issue in &self.issues {
                log::warn!("{source_name}: {}", issue.description);
            }
            return Ok(());
        }

        let message = self
            .issues
            .iter()
            .filter(|issue| issue.fatal)
            .map(|issue| issue.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Err(PipelineError::schema(source_name, message))
    }
}

/// Check a plain header row (CSV store) against the contract of `T`
#[must_use]
pub fn check_header<T: TabularSchema>(headers: &[&str]) -> SchemaCompatibilityReport {
    let mut report = SchemaCompatibilityReport {
        compatible: true,
        issues: Vec::new(),
    };

    for column in T::COLUMNS {
        if !headers.iter().any(|h| h.trim() == column.name) {
            report.issues.push(SchemaIssue {
                column: column.name.to_string(),
                fatal: column.required,
                description: format!(
                    "{} column '{}' missing from {} table",
                    if column.required { "Required" } else { "Optional" },
                    column.name,
                    T::TABLE_NAME
                ),
            });
            if column.required {
                report.compatible = false;
            }
        }
    }

    report
}

/// Check an Arrow schema (CSV with inferred types, or Parquet) against the
/// contract of `T`, including column types
#[must_use]
pub fn check_arrow_schema<T: TabularSchema>(schema: &Schema) -> SchemaCompatibilityReport {
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let mut report = check_header::<T>(&names);

    for column in T::COLUMNS {
        let Ok(field) = schema.field_with_name(column.name) else {
            continue;
        };
        if check_kind_compatibility(field.data_type(), column.kind) == TypeCompatibility::Incompatible {
            report.issues.push(SchemaIssue {
                column: column.name.to_string(),
                fatal: true,
                description: format!(
                    "Column '{}' has type {} which cannot be read as {:?}",
                    column.name,
                    field.data_type(),
                    column.kind
                ),
            });
            report.compatible = false;
        }
    }

    report
}
