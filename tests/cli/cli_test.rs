use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

use crate::utils::{fixture, fixtures_dir, pages_dir};

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("onehealth").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn predict_prints_model_output() {
    cmd()
        .args(["--data-dir"])
        .arg(fixtures_dir())
        .args(["predict", "--region", "Bretagne", "--year", "2023", "--uhii", "2.5", "--co2", "410", "--count-risk", "4"])
        .assert()
        .success()
        .stdout(contains("1350.5"));
}

#[test]
fn predict_weekly_rate() {
    cmd()
        .arg("--data-dir")
        .arg(fixtures_dir())
        .args(["predict", "--region", "Bretagne", "--year", "2023", "--uhii", "2.5", "--co2", "410", "--count-risk", "4", "--weekly"])
        .assert()
        .success()
        .stdout(contains("26"));
}

#[test]
fn predict_unknown_region_fails() {
    cmd()
        .arg("--data-dir")
        .arg(fixtures_dir())
        .args(["predict", "--region", "Atlantis", "--year", "2023", "--uhii", "2.5", "--co2", "410", "--count-risk", "4"])
        .assert()
        .failure()
        .stderr(contains("Atlantis"));
}

#[test]
fn refresh_from_saved_pages_then_latest() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["refresh", "--pages", "1..5", "--from-dir"])
        .arg(pages_dir())
        .assert()
        .success()
        .stdout(contains("3 recalls stored"));

    let table = fs::read_to_string(dir.path().join("rappel_conso_viandes.csv")).unwrap();
    assert!(table.starts_with("product,brand,date,risk_level,region,reason,link,scraped_at"));

    cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["latest", "-n", "1"])
        .assert()
        .success()
        .stdout(contains("Saucisson sec"));
}

#[test]
fn refresh_from_empty_directory_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();

    // An empty page directory yields no records but is not a transport failure
    cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["refresh", "--retries", "0", "--from-dir"])
        .arg(dir.path().join("nothing-here"))
        .assert()
        .success()
        .stdout(contains("0 recalls stored"));
}

#[test]
fn features_writes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("features.csv");

    cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("features")
        .arg("--environment")
        .arg(fixture("environment.csv"))
        .arg("--historical")
        .arg(fixture("historical.csv"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("3 feature rows"));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("region,period,year,count_risk,UHII,CO2,total_CS"));
    assert!(written.contains("Bretagne,2023-W14,2023,0,2.5,410.0,120.0"));
}

#[test]
fn latest_without_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd().arg("--data-dir").arg(dir.path()).args(["latest"]).assert().failure();
}

#[test]
fn refresh_fails_when_retries_are_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    // A directory where the listing page should be cannot be read
    fs::create_dir_all(pages.join("categorie/94/1.html")).unwrap();

    cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["refresh", "--retries", "0", "--from-dir"])
        .arg(&pages)
        .assert()
        .failure()
        .stderr(contains("Extraction failed after 1 attempts"));

    assert!(!dir.path().join("rappel_conso_viandes.csv").exists());
}

#[test]
fn refresh_fails_on_unreadable_detail_page() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    fs::create_dir_all(pages.join("categorie/94")).unwrap();
    fs::copy(
        pages_dir().join("categorie/94/1.html"),
        pages.join("categorie/94/1.html"),
    )
    .unwrap();
    fs::create_dir_all(pages.join("fiche-rappel/101/Interne.html")).unwrap();

    cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["refresh", "--retries", "0", "--from-dir"])
        .arg(&pages)
        .assert()
        .failure();

    assert!(!dir.path().join("rappel_conso_viandes.csv").exists());
}
