//! Environmental observations (UHII, CO2) per region and period

use std::collections::BTreeMap;
use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::loader::{LoadReport, TableLoader, read_table};
use crate::models::{EnvironmentalObservation, ObservationKey, Period};
use crate::schema::{FloatColumn, TextColumn};

/// Environmental observations keyed by (region, period)
pub type EnvironmentTable = BTreeMap<ObservationKey, EnvironmentalObservation>;

impl TableLoader {
    /// Load an environmental table with columns region, period, UHII and CO2
    ///
    /// Unknown measurements (blank, `NA`, ...) are kept as unknown. Rows with
    /// an empty region, an unreadable period or a non-numeric measurement are
    /// rejected and reported.
    pub fn load_environment(&self, path: &Path) -> Result<(EnvironmentTable, LoadReport)> {
        let batches = read_table::<EnvironmentalObservation>(path, self.config())?;

        let mut decoded = Vec::new();
        let mut row_number = 0;
        for batch in &batches {
            decode_batch(self, batch, &mut row_number, &mut decoded)?;
        }

        self.collect_keyed(&path.display().to_string(), decoded)
    }
}

type Decoded = (usize, std::result::Result<(ObservationKey, EnvironmentalObservation), String>);

fn decode_batch(loader: &TableLoader, batch: &RecordBatch, row_number: &mut usize, out: &mut Vec<Decoded>) -> Result<()> {
    let columns = Columns {
        region: TextColumn::from_batch(batch, "region")?,
        period: TextColumn::from_batch(batch, "period")?,
        uhii: FloatColumn::from_batch(batch, "UHII")?,
        co2: FloatColumn::from_batch(batch, "CO2")?,
    };

    for row in 0..batch.num_rows() {
        *row_number += 1;
        out.push((*row_number, decode_row(loader, &columns, row)));
    }

    Ok(())
}

struct Columns {
    region: TextColumn,
    period: TextColumn,
    uhii: FloatColumn,
    co2: FloatColumn,
}

fn decode_row(
    loader: &TableLoader,
    columns: &Columns,
    row: usize,
) -> std::result::Result<(ObservationKey, EnvironmentalObservation), String> {
    let region = columns.region.value(row).ok_or_else(|| "empty region".to_string())?;
    let period: Period = columns
        .period
        .value(row)
        .ok_or_else(|| "empty period".to_string())?
        .parse()
        .map_err(|e| format!("{e}"))?;

    let observation = EnvironmentalObservation {
        region: loader.region(region),
        period,
        uhii: columns.uhii.value(row).map_err(|e| format!("UHII {e}"))?,
        co2: columns.co2.value(row).map_err(|e| format!("CO2 {e}"))?,
    };
    Ok((observation.key(), observation))
}
