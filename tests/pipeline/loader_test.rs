use std::fs;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use onehealth::{LoaderConfig, ObservationKey, Period, PipelineError, Region, RegionResolver, TableLoader};

use crate::utils::fixture;

fn key(region: &str, period: &str) -> ObservationKey {
    ObservationKey::new(Region::new(region), period.parse::<Period>().unwrap())
}

fn lenient() -> TableLoader {
    TableLoader::new(
        LoaderConfig {
            fail_on_conflict: false,
            ..LoaderConfig::default()
        },
        RegionResolver::default(),
    )
}

#[test]
fn test_load_environment_csv() {
    let (table, report) = TableLoader::default()
        .load_environment(&fixture("environment.csv"))
        .unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(report.rows, 4);
    assert_eq!(report.duplicates, 1);
    assert!(report.is_clean());

    let bretagne = &table[&key("Bretagne", "2023-W14")];
    assert_eq!(bretagne.uhii, Some(2.5));
    assert_eq!(bretagne.co2, Some(410.0));

    // "NA" stays unknown rather than becoming zero
    let normandie = &table[&key("Normandie", "2023-W14")];
    assert_eq!(normandie.uhii, Some(1.8));
    assert_eq!(normandie.co2, None);
}

#[test]
fn test_load_historical_csv() {
    let (table, report) = TableLoader::default()
        .load_historical(&fixture("historical.csv"))
        .unwrap();

    assert_eq!(report.loaded, 3);
    assert_eq!(table[&key("Occitanie", "2023-W14")].total_cs, 95.0);
}

#[test]
fn test_missing_required_column_is_schema_error() {
    let result = TableLoader::default().load_environment(&fixture("environment_missing_column.csv"));
    assert!(matches!(result, Err(PipelineError::Schema { message, .. }) if message.contains("CO2")));
}

#[test]
fn test_conflicting_duplicate_is_validation_error() {
    let result = TableLoader::default().load_environment(&fixture("environment_conflict.csv"));
    assert!(matches!(result, Err(PipelineError::Validation(message)) if message.contains("Bretagne/2023")));
}

#[test]
fn test_lenient_loader_reports_rejections() {
    let (table, report) = lenient()
        .load_environment(&fixture("environment_conflict.csv"))
        .unwrap();

    assert_eq!(table.keys().cloned().collect::<Vec<_>>(), vec![key("Normandie", "2023")]);
    let rejected_rows: Vec<_> = report.rejected.iter().map(|r| r.row).collect();
    assert_eq!(rejected_rows, vec![1, 2, 4, 5]);
    assert!(report.rejected[2].reason.contains("empty region"));
}

#[test]
fn test_region_names_are_canonicalised() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("historical.csv");
    fs::write(&path, "region,period,total_CS\nILE DE FRANCE,2023,10\nAlsace,2023,4\n").unwrap();

    let (table, _) = TableLoader::default().load_historical(&path).unwrap();
    assert!(table.contains_key(&key("Île-de-France", "2023")));
    assert!(table.contains_key(&key("Grand Est", "2023")));
}

#[test]
fn test_negative_consultations_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("historical.csv");
    fs::write(&path, "region,period,total_CS\nBretagne,2023,-3\nNormandie,2023,7\n").unwrap();

    let (table, report) = TableLoader::default().load_historical(&path).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(report.rejected.len(), 1);
}

#[test]
fn test_load_environment_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("environment.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("region", DataType::Utf8, false),
        Field::new("period", DataType::Int64, false),
        Field::new("UHII", DataType::Float64, true),
        Field::new("CO2", DataType::Float64, true),
        Field::new("source", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["Bretagne", "Normandie"])),
            Arc::new(Int64Array::from(vec![2022, 2022])),
            Arc::new(Float64Array::from(vec![Some(2.1), None])),
            Arc::new(Float64Array::from(vec![Some(405.0), Some(407.5)])),
            Arc::new(StringArray::from(vec![Some("sensor"), None])),
        ],
    )
    .unwrap();

    let file = fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let (table, report) = TableLoader::default().load_environment(&path).unwrap();
    assert_eq!(report.loaded, 2);
    assert_eq!(table[&key("Bretagne", "2022")].uhii, Some(2.1));
    assert_eq!(table[&key("Normandie", "2022")].uhii, None);
}
