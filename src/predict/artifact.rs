//! Trained model artifact
//!
//! The regression model is opaque behind `RegressionModel`: the adapter only
//! knows which features it was fitted on, in which order, and how to ask it
//! for a prediction. The shipped implementation reads a linear pipeline from
//! JSON.

use std::fmt;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::util::safe_open_file;
use crate::error::{PipelineError, Result};
use crate::predict::encoder::LabelEncoder;

/// A model input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    /// Encoded region code
    Region,
    Year,
    CountRisk,
    Uhii,
    Co2,
}

impl FeatureName {
    /// Order the model was fitted on when the artifact does not say
    pub const DEFAULT_ORDER: [Self; 5] = [Self::Region, Self::Year, Self::CountRisk, Self::Uhii, Self::Co2];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Year => "year",
            Self::CountRisk => "count_risk",
            Self::Uhii => "UHII",
            Self::Co2 => "CO2",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" | "region_encoded" => Ok(Self::Region),
            "year" => Ok(Self::Year),
            "count_risk" => Ok(Self::CountRisk),
            "uhii" => Ok(Self::Uhii),
            "co2" => Ok(Self::Co2),
            _ => Err(PipelineError::schema("model artifact", format!("unknown feature '{s}'"))),
        }
    }
}

/// A fitted regression model
pub trait RegressionModel: fmt::Debug + Send + Sync {
    /// Features the model expects, in vector order
    fn feature_names(&self) -> &[FeatureName];

    /// Predict from a vector laid out as `feature_names`
    fn predict(&self, features: &[f64]) -> Result<f64>;
}

/// Linear regression: `intercept + sum(coefficient * feature)`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    feature_names: Vec<FeatureName>,
    intercept: f64,
    coefficients: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinearModelFile {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    /// Build a model; every feature must appear exactly once with one coefficient
    pub fn new(feature_names: Vec<FeatureName>, intercept: f64, coefficients: Vec<f64>) -> Result<Self> {
        let invalid = |message: String| PipelineError::schema("model artifact", message);

        if coefficients.len() != feature_names.len() {
            return Err(invalid(format!(
                "{} coefficients for {} features",
                coefficients.len(),
                feature_names.len()
            )));
        }
        for feature in FeatureName::DEFAULT_ORDER {
            let occurrences = feature_names.iter().filter(|name| **name == feature).count();
            if occurrences != 1 {
                return Err(invalid(format!("feature '{feature}' appears {occurrences} times")));
            }
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(invalid("non-finite parameter".to_string()));
        }

        Ok(Self {
            feature_names,
            intercept,
            coefficients,
        })
    }

    /// Load a model artifact
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = safe_open_file(path, "model artifact")?;
        let raw: LinearModelFile = serde_json::from_reader(BufReader::new(file))?;

        let feature_names = match raw.feature_names {
            Some(names) => names.iter().map(|name| name.parse::<FeatureName>()).collect::<Result<Vec<_>>>()?,
            None => FeatureName::DEFAULT_ORDER.to_vec(),
        };
        Self::new(feature_names, raw.intercept, raw.coefficients)
    }
}

impl RegressionModel for LinearModel {
    fn feature_names(&self) -> &[FeatureName] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::validation(format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }
        Ok(self.intercept + self.coefficients.iter().zip(features).map(|(c, x)| c * x).sum::<f64>())
    }
}

/// The fitted model and its region encoder, loaded once
#[derive(Debug)]
pub struct TrainedModelArtifact {
    model: Box<dyn RegressionModel>,
    encoder: LabelEncoder,
}

impl TrainedModelArtifact {
    #[must_use]
    pub fn new(model: impl RegressionModel + 'static, encoder: LabelEncoder) -> Self {
        Self {
            model: Box::new(model),
            encoder,
        }
    }

    /// Load the JSON model and encoder artifacts
    pub fn load(model_path: &Path, encoder_path: &Path) -> Result<Self> {
        let model = LinearModel::from_json_file(model_path)?;
        let encoder = LabelEncoder::from_json_file("region", encoder_path)?;
        log::info!(
            "Loaded model artifact {} ({} regions)",
            model_path.display(),
            encoder.classes().len()
        );
        Ok(Self::new(model, encoder))
    }

    /// Code of a region, or `UnknownCategory`
    pub fn encode(&self, region: &str) -> Result<u32> {
        self.encoder.encode(region)
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        self.model.predict(features)
    }

    #[must_use]
    pub fn feature_order(&self) -> &[FeatureName] {
        self.model.feature_names()
    }

    #[must_use]
    pub const fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}
