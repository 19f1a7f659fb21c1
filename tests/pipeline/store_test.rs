use std::collections::BTreeSet;
use std::fs;

use onehealth::extract::{FileSource, RecallExtractor};
use onehealth::{PipelineError, RecallRecord, RecallStore, Result, RiskLevel};

use crate::utils::{date, offline_config, pages_dir, recall, timestamp};

/// Records compared as a set, ignoring when they were scraped
fn content(records: &[RecallRecord]) -> BTreeSet<String> {
    records
        .iter()
        .map(|r| {
            format!(
                "{}|{}|{}|{}|{}|{:?}|{:?}",
                r.product, r.brand, r.date, r.risk_level, r.region, r.reason, r.link
            )
        })
        .collect()
}

#[test]
fn test_write_then_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecallStore::new(dir.path().join("recalls.csv"));

    let records = vec![
        recall("Saucisson sec", "Bretagne", date(2025, 2, 14))
            .with_reason("Présence de Listeria, lot 42")
            .with_link("https://rappel.conso.gouv.fr/fiche-rappel/101/Interne"),
        RecallRecord::new(
            "Rillettes",
            "Conserverie \"Martin\"",
            date(2025, 2, 10),
            RiskLevel::Other("Défaut d'étiquetage".to_string()),
            "France entière",
        ),
    ];

    assert_eq!(store.write(records.clone()).unwrap(), 2);
    let read = store.read().unwrap();

    assert_eq!(content(&read), content(&records));
    assert_eq!(read.iter().find(|r| r.product == "Saucisson sec").unwrap().scraped_at, timestamp("2025-03-01 12:00:00"));
}

#[test]
fn test_write_deduplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecallStore::new(dir.path().join("recalls.csv"));

    let old = recall("Pâté", "Bretagne", date(2025, 1, 5)).with_reason("ancien");
    let new = recall("Pâté", "Bretagne", date(2025, 1, 5))
        .with_reason("nouveau")
        .scraped_at(timestamp("2025-03-02 12:00:00"));

    assert_eq!(store.write([new, old]).unwrap(), 1);
    let read = store.read().unwrap();
    assert_eq!(read[0].reason.as_deref(), Some("nouveau"));
}

#[test]
fn test_read_requires_core_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recalls.csv");
    fs::write(&path, "product,brand,date,region\nSaucisson,Dupont,2025-02-14,Bretagne\n").unwrap();

    let result = RecallStore::new(&path).read();
    assert!(matches!(result, Err(PipelineError::Schema { message, .. }) if message.contains("risk_level")));
}

#[test]
fn test_read_accepts_minimal_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recalls.csv");
    fs::write(
        &path,
        "product,brand,date,risk_level,region\nSaucisson,Dupont,2025-02-14,listeria,Bretagne\nJambon,Roux,not-a-date,listeria,Bretagne\n",
    )
    .unwrap();

    let read = RecallStore::new(&path).read().unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].risk_level, RiskLevel::Listeria);
    assert_eq!(read[0].reason, None);
}

#[test]
fn test_latest_orders_by_date() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecallStore::new(dir.path().join("recalls.csv"));
    store
        .write([
            recall("A", "Bretagne", date(2025, 1, 1)),
            recall("B", "Bretagne", date(2025, 3, 1)),
            recall("C", "Bretagne", date(2025, 2, 1)),
        ])
        .unwrap();

    let latest = store.latest(2).unwrap();
    let products: Vec<_> = latest.iter().map(|r| r.product.as_str()).collect();
    assert_eq!(products, ["B", "C"]);
}

#[test]
fn test_repeated_extraction_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecallStore::new(dir.path().join("recalls.csv"));
    let extractor = RecallExtractor::new(FileSource::new(pages_dir()), offline_config()).unwrap();

    let first: Vec<_> = extractor
        .extract_at(timestamp("2025-03-01 12:00:00"))
        .collect::<Result<_>>()
        .unwrap();
    let single = store.merge(first).unwrap();
    let after_one = store.read().unwrap();

    let second: Vec<_> = extractor
        .extract_at(timestamp("2025-03-08 12:00:00"))
        .collect::<Result<_>>()
        .unwrap();
    let report = store.merge(second).unwrap();
    let after_two = store.read().unwrap();

    assert_eq!(single.total, 3);
    assert_eq!(report.total, 3);
    assert_eq!(report.added(), 0);
    assert_eq!(content(&after_one), content(&after_two));
    // The later scrape supersedes the earlier copy
    assert!(after_two.iter().all(|r| r.scraped_at == timestamp("2025-03-08 12:00:00")));
}
