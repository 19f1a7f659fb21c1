//! Environmental and historical table loading
//!
//! Tables are CSV (header row, column types inferred by `arrow::csv`) or
//! Parquet, chosen by file extension. Each table is checked against the
//! column contract of its row type before any row is read, then decoded row
//! by row into a map keyed by (region, period).

pub mod environment;
pub mod historical;

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rustc_hash::FxHashSet;

use crate::config::LoaderConfig;
use crate::error::util::safe_open_file;
use crate::error::{PipelineError, Result};
use crate::models::{ObservationKey, Region, RegionResolver};
use crate::schema::{TabularSchema, check_arrow_schema};
use crate::utils::logging::{log_operation_complete, log_operation_start};

pub use environment::EnvironmentTable;
pub use historical::HistoricalTable;

/// On-disk table format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Format implied by a file extension; anything but Parquet reads as CSV
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("parquet" | "pq") => Self::Parquet,
            _ => Self::Csv,
        }
    }
}

/// A row that did not make it into the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub reason: String,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

/// What happened while loading one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// File the table came from
    pub source: String,
    /// Data rows read
    pub rows: usize,
    /// Keys in the resulting table
    pub loaded: usize,
    /// Rows that repeated a key with identical values
    pub duplicates: usize,
    /// Rows dropped, with the reason
    pub rejected: Vec<RowRejection>,
}

impl LoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Loader for the keyed environmental and historical tables
#[derive(Debug, Clone, Default)]
pub struct TableLoader {
    config: LoaderConfig,
    resolver: RegionResolver,
}

impl TableLoader {
    #[must_use]
    pub const fn new(config: LoaderConfig, resolver: RegionResolver) -> Self {
        Self { config, resolver }
    }

    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Canonical region for a table cell; unknown names are kept as written
    fn region(&self, text: &str) -> Region {
        if let Some(region) = self.resolver.lookup(text) {
            return region.clone();
        }
        log::debug!("Region '{text}' is not in the known vocabulary, keeping it verbatim");
        Region::new(text)
    }

    /// Collect decoded rows into a keyed table
    ///
    /// Identical repeats collapse. A key repeated with different values is a
    /// `ValidationError` when `fail_on_conflict` is set; otherwise every row
    /// of that key is rejected and the key is left out of the table.
    fn collect_keyed<T, I>(&self, source: &str, rows: I) -> Result<(BTreeMap<ObservationKey, T>, LoadReport)>
    where
        T: PartialEq + fmt::Debug,
        I: IntoIterator<Item = (usize, std::result::Result<(ObservationKey, T), String>)>,
    {
        let mut table: BTreeMap<ObservationKey, (usize, T)> = BTreeMap::new();
        let mut conflicted: FxHashSet<ObservationKey> = FxHashSet::default();
        let mut report = LoadReport {
            source: source.to_string(),
            ..LoadReport::default()
        };

        for (row, decoded) in rows {
            report.rows += 1;
            let (key, value) = match decoded {
                Ok(pair) => pair,
                Err(reason) => {
                    report.rejected.push(RowRejection { row, reason });
                    continue;
                }
            };

            if conflicted.contains(&key) {
                report.rejected.push(RowRejection {
                    row,
                    reason: format!("conflicting duplicate of {key}"),
                });
                continue;
            }

            match table.get(&key) {
                None => {
                    table.insert(key, (row, value));
                }
                Some((_, existing)) if *existing == value => report.duplicates += 1,
                Some((first_row, existing)) => {
                    if self.config.fail_on_conflict {
                        return Err(PipelineError::validation(format!(
                            "{source}: key {key} appears at rows {first_row} and {row} with different values ({existing:?} vs {value:?})"
                        )));
                    }
                    let first_row = *first_row;
                    table.remove(&key);
                    report.rejected.push(RowRejection {
                        row: first_row,
                        reason: format!("conflicting duplicate of {key}"),
                    });
                    report.rejected.push(RowRejection {
                        row,
                        reason: format!("conflicting duplicate of {key}"),
                    });
                    conflicted.insert(key);
                }
            }
        }

        report.rejected.sort_by_key(|rejection| rejection.row);
        report.loaded = table.len();

        if !report.rejected.is_empty() {
            log::warn!("{source}: {} of {} rows rejected", report.rejected.len(), report.rows);
            if self.config.log_rejections {
                for rejection in &report.rejected {
                    log::warn!("{source}: {rejection}");
                }
            }
        }

        let table = table.into_iter().map(|(key, (_, value))| (key, value)).collect();
        Ok((table, report))
    }
}

/// Read a whole table as record batches after checking it against the
/// column contract of `T`
pub fn read_table<T: TabularSchema>(path: &Path, config: &LoaderConfig) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    let format = TableFormat::from_path(path);
    log_operation_start(&format!("Reading {} table", T::TABLE_NAME), path.display());

    let batches = match format {
        TableFormat::Csv => read_csv::<T>(path, config)?,
        TableFormat::Parquet => read_parquet::<T>(path, config)?,
    };

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("read", path.display(), rows, Some(start.elapsed()));
    Ok(batches)
}

fn read_csv<T: TabularSchema>(path: &Path, config: &LoaderConfig) -> Result<Vec<RecordBatch>> {
    let mut file = safe_open_file(path, T::TABLE_NAME)?;
    let format = Format::default()
        .with_header(true)
        .with_delimiter(config.delimiter_byte()?);

    let (schema, _) = format.infer_schema(&mut file, None)?;
    check_arrow_schema::<T>(&schema).into_result(&path.display().to_string())?;

    file.seek(SeekFrom::Start(0)).map_err(|e| PipelineError::io(path, e))?;
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .with_batch_size(config.batch_size)
        .build(file)?;

    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn read_parquet<T: TabularSchema>(path: &Path, config: &LoaderConfig) -> Result<Vec<RecordBatch>> {
    let file = safe_open_file(path, T::TABLE_NAME)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    check_arrow_schema::<T>(builder.schema()).into_result(&path.display().to_string())?;

    // Only decode the contract's columns
    let file_schema = builder.schema().clone();
    let projection: Vec<usize> = T::COLUMNS
        .iter()
        .filter_map(|column| file_schema.index_of(column.name).ok())
        .collect();
    let mask = ProjectionMask::roots(builder.parquet_schema(), projection);

    let reader = builder.with_projection(mask).with_batch_size(config.batch_size).build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}
