//! Persisted recall table
//!
//! Recalls live in a single CSV file, one row per record, newest first. The
//! file is always written whole: a write goes to a sibling temp file that is
//! then renamed over the old table.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::error::util::{ensure_parent_dir, safe_open_file};
use crate::error::{PipelineError, Result};
use crate::models::{RecallKey, RecallRecord};
use crate::schema::{TabularSchema, check_header};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Outcome of merging a fresh scrape into the stored table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records in the table before the merge
    pub previous: usize,
    /// Records in the fresh scrape
    pub fresh: usize,
    /// Records written
    pub total: usize,
}

impl MergeReport {
    /// Keys that were not in the table before
    #[must_use]
    pub const fn added(&self) -> usize {
        self.total.saturating_sub(self.previous)
    }
}

/// Keep one record per dedup key
///
/// The copy with the newest `scraped_at` wins; on equal scrape times the one
/// that comes later in the input wins. Output is sorted newest recall first.
pub fn dedup_records(records: impl IntoIterator<Item = RecallRecord>) -> Vec<RecallRecord> {
    let mut by_key: FxHashMap<RecallKey, RecallRecord> = FxHashMap::default();

    for record in records {
        let key = record.key();
        match by_key.get(&key) {
            Some(kept) if kept.scraped_at > record.scraped_at => {}
            _ => {
                by_key.insert(key, record);
            }
        }
    }

    by_key.into_values().sorted_by(newest_first).collect()
}

fn newest_first(a: &RecallRecord, b: &RecallRecord) -> std::cmp::Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.scraped_at.cmp(&a.scraped_at))
        .then_with(|| a.product.cmp(&b.product))
        .then_with(|| a.brand.cmp(&b.brand))
        .then_with(|| a.region.cmp(&b.region))
}

/// CSV-backed recall table
#[derive(Debug, Clone)]
pub struct RecallStore {
    path: PathBuf,
}

impl RecallStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read every record
    ///
    /// A header missing any of product, brand, date, risk_level or region
    /// fails the whole read with a `SchemaError`. Rows that do not decode
    /// are logged and skipped.
    pub fn read(&self) -> Result<Vec<RecallRecord>> {
        let start = Instant::now();
        log_operation_start("Reading recall table", self.path.display());

        let file = safe_open_file(&self.path, "recall table")?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let headers = reader.headers()?.clone();
        let header_names: Vec<&str> = headers.iter().collect();
        check_header::<RecallRecord>(&header_names).into_result(&self.path.display().to_string())?;

        let mut records = Vec::new();
        let mut skipped = 0_usize;
        for (idx, row) in reader.deserialize::<RecallRecord>().enumerate() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    let target = format!("row {}: {e}", idx + 2);
                    log_warning("Skipping unreadable recall row", Some(&target));
                }
            }
        }

        if skipped > 0 {
            log::warn!("{skipped} rows of {} could not be read", self.path.display());
        }
        log_operation_complete("read", self.path.display(), records.len(), Some(start.elapsed()));
        Ok(records)
    }

    /// Read the table, or an empty set when it does not exist yet
    pub fn read_or_empty(&self) -> Result<Vec<RecallRecord>> {
        if self.exists() {
            self.read()
        } else {
            log::info!("No recall table at {}, starting empty", self.path.display());
            Ok(Vec::new())
        }
    }

    /// Replace the table with the deduplicated `records`
    pub fn write(&self, records: impl IntoIterator<Item = RecallRecord>) -> Result<usize> {
        let records = dedup_records(records);
        ensure_parent_dir(&self.path)?;

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            if records.is_empty() {
                // serialize() only emits the header with the first row
                writer.write_record(RecallRecord::COLUMNS.iter().map(|column| column.name))?;
            }
            for record in &records {
                writer.serialize(record)?;
            }
            writer.flush().map_err(|e| PipelineError::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| PipelineError::io(&self.path, e))?;

        log_operation_complete("wrote", self.path.display(), records.len(), None);
        Ok(records.len())
    }

    /// Merge a fresh scrape into the stored table and write the result
    pub fn merge(&self, fresh: Vec<RecallRecord>) -> Result<MergeReport> {
        let stored = self.read_or_empty()?;
        let previous = dedup_records(stored);
        let report_previous = previous.len();
        let fresh_count = fresh.len();

        let total = self.write(previous.into_iter().chain(fresh))?;
        Ok(MergeReport {
            previous: report_previous,
            fresh: fresh_count,
            total,
        })
    }

    /// The `n` most recent recalls, by date then scrape time
    pub fn latest(&self, n: usize) -> Result<Vec<RecallRecord>> {
        let mut records = dedup_records(self.read()?);
        records.truncate(n);
        Ok(records)
    }
}
