//! Feature rows produced by the join

use serde::Serialize;

use crate::models::observation::ObservationKey;
use crate::models::period::Period;
use crate::models::region::Region;

/// One (region, period) row of model features
///
/// `total_cs` is the training label and is absent when the row is only used
/// for prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub region: Region,
    pub period: Period,
    pub year: i32,
    pub count_risk: u32,
    #[serde(rename = "UHII")]
    pub uhii: Option<f64>,
    #[serde(rename = "CO2")]
    pub co2: Option<f64>,
    #[serde(rename = "total_CS")]
    pub total_cs: Option<f64>,
}

impl FeatureRow {
    /// Row with every model input and the label present
    #[must_use]
    pub const fn is_training_ready(&self) -> bool {
        self.uhii.is_some() && self.co2.is_some() && self.total_cs.is_some()
    }

    #[must_use]
    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.region.clone(), self.period)
    }
}

/// Why a key did not make it into the training-ready output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    /// Historical label present, no environmental row for the key
    MissingEnvironmental,
    /// Environmental row present with UHII or CO2 unknown
    UnknownEnvironmentalValues,
    /// Environmental row present, no historical label
    MissingLabel,
}

/// Diagnostics entry for a key excluded from training
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteKey {
    pub key: ObservationKey,
    pub reason: IncompleteReason,
}
