//! Prediction adapter
//!
//! Turns one (region, year, UHII, CO2, count_risk) request into the feature
//! vector the trained model was fitted on and returns the model's scalar as
//! is. The artifact is loaded once and shared read-only through a cheap,
//! cloneable `Predictor` handle.

pub mod artifact;
pub mod encoder;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::StorePaths;
use crate::error::{PipelineError, Result};
use crate::models::FeatureRow;

pub use artifact::{FeatureName, LinearModel, RegressionModel, TrainedModelArtifact};
pub use encoder::LabelEncoder;

/// Average number of weeks in a year, used to express an annual figure per week
pub const WEEKS_PER_YEAR: f64 = 52.14;

/// Years accepted by the adapter
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

/// One prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub region: String,
    pub year: i32,
    #[serde(rename = "UHII")]
    pub uhii: f64,
    #[serde(rename = "CO2")]
    pub co2: f64,
    pub count_risk: u32,
}

impl PredictionInput {
    /// Check the numeric inputs; the region is checked by the encoder
    pub fn validate(&self) -> Result<()> {
        if !YEAR_RANGE.contains(&self.year) {
            return Err(PipelineError::validation(format!(
                "year {} outside {}..={}",
                self.year,
                YEAR_RANGE.start(),
                YEAR_RANGE.end()
            )));
        }
        for (name, value) in [("UHII", self.uhii), ("CO2", self.co2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::validation(format!("{name} must be a finite, non-negative number, got {value}")));
            }
        }
        Ok(())
    }
}

impl TryFrom<&FeatureRow> for PredictionInput {
    type Error = PipelineError;

    /// Rows with an unknown measurement cannot be predicted
    fn try_from(row: &FeatureRow) -> Result<Self> {
        let unknown = |name: &str| PipelineError::validation(format!("{name} is unknown for {}", row.key()));
        Ok(Self {
            region: row.region.to_string(),
            year: row.year,
            uhii: row.uhii.ok_or_else(|| unknown("UHII"))?,
            co2: row.co2.ok_or_else(|| unknown("CO2"))?,
            count_risk: row.count_risk,
        })
    }
}

/// Shared read-only handle to the trained artifact
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: Arc<TrainedModelArtifact>,
}

impl Predictor {
    #[must_use]
    pub fn new(artifact: TrainedModelArtifact) -> Self {
        Self {
            artifact: Arc::new(artifact),
        }
    }

    /// Load the model and encoder named in `paths`
    pub fn load(paths: &StorePaths) -> Result<Self> {
        let artifact = TrainedModelArtifact::load(&paths.model_path(), &paths.encoder_path())?;
        Ok(Self::new(artifact))
    }

    /// Regions the encoder was fitted on
    #[must_use]
    pub fn known_regions(&self) -> &[String] {
        self.artifact.encoder().classes()
    }

    /// Feature vector for a request, in the model's order
    ///
    /// Fails with `UnknownCategory` for a region the encoder never saw and
    /// with `ValidationError` for out-of-range numbers.
    pub fn feature_vector(&self, input: &PredictionInput) -> Result<Vec<f64>> {
        let region_code = self.artifact.encode(&input.region)?;
        input.validate()?;

        Ok(self
            .artifact
            .feature_order()
            .iter()
            .map(|feature| match feature {
                FeatureName::Region => f64::from(region_code),
                FeatureName::Year => f64::from(input.year),
                FeatureName::CountRisk => f64::from(input.count_risk),
                FeatureName::Uhii => input.uhii,
                FeatureName::Co2 => input.co2,
            })
            .collect())
    }

    /// Model output for one request, unmodified
    pub fn predict(&self, input: &PredictionInput) -> Result<f64> {
        let features = self.feature_vector(input)?;
        let prediction = self.artifact.predict(&features)?;
        log::debug!("Prediction for {} {}: {prediction}", input.region, input.year);
        Ok(prediction)
    }

    /// Model output for a joined feature row
    pub fn predict_row(&self, row: &FeatureRow) -> Result<f64> {
        self.predict(&PredictionInput::try_from(row)?)
    }
}

/// Annual prediction expressed per week, rounded to a whole number
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn weekly_rate(prediction: f64) -> i64 {
    (prediction / WEEKS_PER_YEAR).round() as i64
}
