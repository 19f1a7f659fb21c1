//! Historical consultation counts per region and period

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::loader::{LoadReport, TableLoader, read_table};
use crate::models::{HistoricalConsultation, ObservationKey, Period};
use crate::schema::{FloatColumn, TextColumn};

/// Historical consultations keyed by (region, period)
pub type HistoricalTable = BTreeMap<ObservationKey, HistoricalConsultation>;

impl TableLoader {
    /// Load a historical table with columns region, period and total_CS
    ///
    /// `total_CS` must be a known, non-negative number; other rows are
    /// rejected and reported.
    pub fn load_historical(&self, path: &Path) -> Result<(HistoricalTable, LoadReport)> {
        let batches = read_table::<HistoricalConsultation>(path, self.config())?;

        let mut decoded = Vec::new();
        let mut row_number = 0_usize;
        for batch in &batches {
            let regions = TextColumn::from_batch(batch, "region")?;
            let periods = TextColumn::from_batch(batch, "period")?;
            let totals = FloatColumn::from_batch(batch, "total_CS")?;

            for row in 0..batch.num_rows() {
                row_number += 1;
                let consultation = (|| -> std::result::Result<HistoricalConsultation, String> {
                    let region = regions.value(row).ok_or_else(|| "empty region".to_string())?;
                    let period: Period = periods
                        .value(row)
                        .ok_or_else(|| "empty period".to_string())?
                        .parse()
                        .map_err(|e| format!("{e}"))?;
                    let total_cs = totals
                        .value(row)
                        .map_err(|e| format!("total_CS {e}"))?
                        .ok_or_else(|| "total_CS is unknown".to_string())?;
                    if total_cs < 0.0 {
                        return Err(format!("total_CS {total_cs} is negative"));
                    }
                    Ok(HistoricalConsultation {
                        region: self.region(region),
                        period,
                        total_cs,
                    })
                })();
                decoded.push((row_number, consultation.map(|c| (c.key(), c))));
            }
        }

        self.collect_keyed(&path.display().to_string(), decoded)
    }
}
