//! Shared helpers: date parsing, logging and progress reporting

pub mod date;
pub mod logging;

pub use date::{detect_date_format, parse_date_string};
