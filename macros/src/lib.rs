//! Procedural macros for the onehealth crate
//!
//! This crate provides the `TabularSchema` derive, which turns a row struct
//! into the column contract used to validate persisted tables before they
//! are read.

use proc_macro::TokenStream;

mod tabular_schema;
mod utils;

/// Derive macro for generating a `TabularSchema` implementation
///
/// Every named field becomes a column. Non-`Option` fields are required
/// unless marked `optional`, and `Option` fields can be marked `required`
/// when the column must exist but may hold nulls. The column kind is inferred from the field type
/// and can be overridden with `kind = "text" | "float" | "integer" | "date" | "datetime"`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(TabularSchema)]
/// #[table(name = "environment")]
/// struct EnvironmentalObservation {
///     #[column(name = "region", kind = "text")]
///     region: Region,
///
///     #[column(name = "UHII", required)]
///     uhii: Option<f64>,
///
///     #[column(skip)]
///     source_row: usize,
/// }
/// ```
#[proc_macro_derive(TabularSchema, attributes(table, column))]
pub fn derive_tabular_schema(input: TokenStream) -> TokenStream {
    tabular_schema::process_derive_tabular_schema(input)
}
