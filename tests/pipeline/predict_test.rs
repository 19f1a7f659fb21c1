use std::thread;

use onehealth::predict::{FeatureName, LabelEncoder, RegressionModel, TrainedModelArtifact};
use onehealth::{FeatureRow, PipelineError, PredictionInput, Predictor, Region, Result, StorePaths};

use crate::utils::fixtures_dir;

/// Returns a fixed scalar for exactly one encoded vector
#[derive(Debug)]
struct StubModel {
    expected: Vec<f64>,
    output: f64,
}

impl RegressionModel for StubModel {
    fn feature_names(&self) -> &[FeatureName] {
        &FeatureName::DEFAULT_ORDER
    }

    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features == self.expected.as_slice() {
            Ok(self.output)
        } else {
            Err(PipelineError::validation(format!("unexpected features {features:?}")))
        }
    }
}

fn stub_predictor() -> Predictor {
    let encoder = LabelEncoder::new(
        "region",
        ["Auvergne-Rhône-Alpes", "Bretagne", "Normandie"].map(String::from).to_vec(),
    )
    .unwrap();
    let model = StubModel {
        expected: vec![1.0, 2023.0, 4.0, 2.5, 410.0],
        output: 137.25,
    };
    Predictor::new(TrainedModelArtifact::new(model, encoder))
}

fn bretagne() -> PredictionInput {
    PredictionInput {
        region: "Bretagne".to_string(),
        year: 2023,
        uhii: 2.5,
        co2: 410.0,
        count_risk: 4,
    }
}

#[test]
fn test_stub_model_scalar_is_returned_unmodified() {
    let predictor = stub_predictor();
    assert_eq!(predictor.predict(&bretagne()).unwrap(), 137.25);
}

#[test]
fn test_unknown_region_is_rejected() {
    let predictor = stub_predictor();
    let input = PredictionInput {
        region: "Atlantis".to_string(),
        ..bretagne()
    };

    let result = predictor.predict(&input);
    assert!(matches!(result, Err(PipelineError::UnknownCategory { value, .. }) if value == "Atlantis"));
}

#[test]
fn test_invalid_numbers_are_rejected() {
    let predictor = stub_predictor();
    let input = PredictionInput { co2: f64::INFINITY, ..bretagne() };
    assert!(matches!(predictor.predict(&input), Err(PipelineError::Validation(_))));
}

#[test]
fn test_feature_order_follows_artifact() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("model.json"),
        r#"{"feature_names": ["CO2", "UHII", "region", "count_risk", "year"], "intercept": 0.0, "coefficients": [0, 0, 0, 0, 0]}"#,
    )
    .unwrap();
    std::fs::copy(fixtures_dir().join("region_encoder.json"), dir.path().join("region_encoder.json")).unwrap();

    let paths = StorePaths {
        data_dir: dir.path().to_path_buf(),
        ..StorePaths::default()
    };
    let predictor = Predictor::load(&paths).unwrap();
    assert_eq!(predictor.feature_vector(&bretagne()).unwrap(), vec![410.0, 2.5, 1.0, 4.0, 2023.0]);
}

#[test]
fn test_unknown_feature_name_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("model.json"),
        r#"{"feature_names": ["region", "year", "count_risk", "UHII", "humidity"], "intercept": 0.0, "coefficients": [0, 0, 0, 0, 0]}"#,
    )
    .unwrap();
    std::fs::copy(fixtures_dir().join("region_encoder.json"), dir.path().join("region_encoder.json")).unwrap();

    let paths = StorePaths {
        data_dir: dir.path().to_path_buf(),
        ..StorePaths::default()
    };
    assert!(matches!(Predictor::load(&paths), Err(PipelineError::Schema { .. })));
}

#[test]
fn test_fixture_artifacts_and_shared_handle() {
    let paths = StorePaths {
        data_dir: fixtures_dir(),
        ..StorePaths::default()
    };
    let predictor = Predictor::load(&paths).unwrap();
    assert_eq!(predictor.known_regions().len(), 4);

    // 100 + 1*1 + 0.5*2023 + 2*4 + 10*2.5 + 0.5*410
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let predictor = predictor.clone();
            thread::spawn(move || predictor.predict(&bretagne()).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1350.5);
    }
}

#[test]
fn test_predict_feature_row() {
    let predictor = stub_predictor();
    let row = FeatureRow {
        region: Region::new("Bretagne"),
        period: "2023-W14".parse().unwrap(),
        year: 2023,
        count_risk: 4,
        uhii: Some(2.5),
        co2: Some(410.0),
        total_cs: None,
    };
    assert_eq!(predictor.predict_row(&row).unwrap(), 137.25);

    let unknown = FeatureRow { co2: None, ..row };
    assert!(matches!(predictor.predict_row(&unknown), Err(PipelineError::Validation(_))));
}
