//! Environmental and historical consultation observations
//!
//! Both tables are keyed by (region, period) and hold at most one row per
//! key. Missing measurements stay `None` ("unknown") all the way to the
//! feature rows; they are never read as zero.

use onehealth_macros::TabularSchema;
use serde::Serialize;

use crate::models::period::Period;
use crate::models::region::Region;

/// Join key shared by every per-region, per-period table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObservationKey {
    pub region: Region,
    pub period: Period,
}

impl ObservationKey {
    #[must_use]
    pub const fn new(region: Region, period: Period) -> Self {
        Self { region, period }
    }
}

impl std::fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.region, self.period)
    }
}

/// One (region, period) row of environmental indicators
#[derive(Debug, Clone, PartialEq, TabularSchema)]
#[table(name = "environment")]
pub struct EnvironmentalObservation {
    #[column(kind = "text")]
    pub region: Region,
    #[column(kind = "text")]
    pub period: Period,
    /// Urban Heat Island Index
    #[column(name = "UHII", required)]
    pub uhii: Option<f64>,
    /// CO2 concentration
    #[column(name = "CO2", required)]
    pub co2: Option<f64>,
}

impl EnvironmentalObservation {
    #[must_use]
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.region.clone(), self.period)
    }

    /// Whether both indicators are known
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.uhii.is_some() && self.co2.is_some()
    }
}

/// One (region, period) row of historical consultation counts
#[derive(Debug, Clone, PartialEq, TabularSchema)]
#[table(name = "historical consultations")]
pub struct HistoricalConsultation {
    #[column(kind = "text")]
    pub region: Region,
    #[column(kind = "text")]
    pub period: Period,
    /// Total consultations in the period
    #[column(name = "total_CS")]
    pub total_cs: f64,
}

impl HistoricalConsultation {
    #[must_use]
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.region.clone(), self.period)
    }
}
