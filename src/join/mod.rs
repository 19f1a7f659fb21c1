//! Feature join
//!
//! Combines the recall table with the environmental and historical tables
//! into one `FeatureRow` per environmental (region, period) key. A row's
//! `count_risk` is the number of recalls sold in its region whose date falls
//! inside the lookback window ending at the period's last day.

use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::JoinConfig;
use crate::error::Result;
use crate::error::util::ensure_parent_dir;
use crate::loader::{EnvironmentTable, HistoricalTable};
use crate::models::{
    FeatureRow, IncompleteKey, IncompleteReason, RecallKey, RecallRecord, Region, RegionResolver, RegionScope,
};
use crate::utils::logging::log_operation_complete;

/// Rows produced by a join, plus the keys that cannot be used for training
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutput {
    /// One row per environmental key, sorted by region then period
    pub rows: Vec<FeatureRow>,
    /// Keys excluded from training, with the reason
    pub incomplete: Vec<IncompleteKey>,
}

impl JoinOutput {
    /// Rows with every feature known and a label
    pub fn training_rows(&self) -> impl Iterator<Item = &FeatureRow> {
        self.rows.iter().filter(|row| row.is_training_ready())
    }

    /// Every row, including those with unknown measurements
    #[must_use]
    pub fn prediction_rows(&self) -> &[FeatureRow] {
        &self.rows
    }
}

/// Recall dates indexed by where they were sold, each list sorted
#[derive(Debug, Default)]
struct RecallIndex {
    by_region: FxHashMap<Region, Vec<NaiveDate>>,
    national: Vec<NaiveDate>,
    unresolved: usize,
}

impl RecallIndex {
    fn build(recalls: &[RecallRecord], resolver: &RegionResolver) -> Self {
        let mut index = Self::default();
        let mut scopes: FxHashMap<&str, RegionScope> = FxHashMap::default();
        let mut seen: FxHashSet<RecallKey> = FxHashSet::default();

        for recall in recalls {
            if !seen.insert(recall.key()) {
                continue;
            }

            let scope = scopes.entry(recall.region.as_str()).or_insert_with(|| {
                let scope = resolver.resolve(&recall.region);
                if let RegionScope::Unresolved(text) = &scope {
                    log::warn!("Recall region '{text}' matches no known region; excluded from counts");
                }
                scope
            });

            match scope {
                RegionScope::National => index.national.push(recall.date),
                RegionScope::Regions(regions) => {
                    for region in regions.iter() {
                        index.by_region.entry(region.clone()).or_default().push(recall.date);
                    }
                }
                RegionScope::Unresolved(_) => index.unresolved += 1,
            }
        }

        index.national.sort_unstable();
        for dates in index.by_region.values_mut() {
            dates.sort_unstable();
        }
        index
    }

    fn count(&self, region: &Region, range: &RangeInclusive<NaiveDate>, count_national: bool) -> u32 {
        let regional = self.by_region.get(region).map_or(0, |dates| count_in_range(dates, range));
        let national = if count_national {
            count_in_range(&self.national, range)
        } else {
            0
        };
        regional + national
    }
}

/// Number of dates in a sorted slice that fall inside `range`
#[must_use]
pub fn count_in_range(sorted: &[NaiveDate], range: &RangeInclusive<NaiveDate>) -> u32 {
    let lo = sorted.partition_point(|date| date < range.start());
    let hi = sorted.partition_point(|date| date <= range.end());
    u32::try_from(hi.saturating_sub(lo)).unwrap_or(u32::MAX)
}

/// Joins recalls with environmental and historical tables
#[derive(Debug, Clone, Default)]
pub struct FeatureJoin {
    config: JoinConfig,
    resolver: RegionResolver,
}

impl FeatureJoin {
    #[must_use]
    pub const fn new(config: JoinConfig, resolver: RegionResolver) -> Self {
        Self { config, resolver }
    }

    /// Build feature rows for every environmental key
    ///
    /// Historical keys without an environmental row only show up in
    /// `incomplete`. Recalls whose region does not resolve count nowhere.
    #[must_use]
    pub fn join(
        &self,
        recalls: &[RecallRecord],
        environment: &EnvironmentTable,
        historical: &HistoricalTable,
    ) -> JoinOutput {
        let start = Instant::now();
        let index = RecallIndex::build(recalls, &self.resolver);
        if index.unresolved > 0 {
            log::info!("{} recalls with an unresolved region were left out of the counts", index.unresolved);
        }

        let lookback = self.config.lookback;
        let count_national = self.config.count_national;

        let (rows, mut incomplete): (Vec<FeatureRow>, Vec<Option<IncompleteKey>>) = environment
            .par_iter()
            .map(|(key, observation)| {
                let count_risk = lookback
                    .range(&key.period)
                    .map_or(0, |range| index.count(&key.region, &range, count_national));
                let total_cs = historical.get(key).map(|h| h.total_cs);

                let row = FeatureRow {
                    region: key.region.clone(),
                    period: key.period,
                    year: key.period.year_number(),
                    count_risk,
                    uhii: observation.uhii,
                    co2: observation.co2,
                    total_cs,
                };

                let reason = if !observation.is_complete() {
                    Some(IncompleteReason::UnknownEnvironmentalValues)
                } else if total_cs.is_none() {
                    Some(IncompleteReason::MissingLabel)
                } else {
                    None
                };
                (row, reason.map(|reason| IncompleteKey { key: key.clone(), reason }))
            })
            .unzip();

        incomplete.extend(
            historical
                .keys()
                .filter(|key| !environment.contains_key(*key))
                .map(|key| {
                    Some(IncompleteKey {
                        key: key.clone(),
                        reason: IncompleteReason::MissingEnvironmental,
                    })
                }),
        );

        let mut incomplete: Vec<IncompleteKey> = incomplete.into_iter().flatten().collect();
        incomplete.sort_by(|a, b| a.key.cmp(&b.key));

        log_operation_complete("joined", format!("{} environmental keys", environment.len()), rows.len(), Some(start.elapsed()));
        if !incomplete.is_empty() {
            log::info!("{} keys are not training-ready", incomplete.len());
        }

        JoinOutput { rows, incomplete }
    }
}

/// Write feature rows as CSV (`region,period,year,count_risk,UHII,CO2,total_CS`)
pub fn write_feature_csv<'a>(rows: impl IntoIterator<Item = &'a FeatureRow>, path: &Path) -> Result<usize> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }
    writer.flush().map_err(|e| crate::error::PipelineError::io(path, e))?;
    log_operation_complete("wrote", path.display(), written, None);
    Ok(written)
}
