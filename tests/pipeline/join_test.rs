use onehealth::models::IncompleteReason;
use onehealth::{
    EnvironmentTable, EnvironmentalObservation, FeatureJoin, HistoricalConsultation, HistoricalTable, JoinConfig,
    LookbackWindow, ObservationKey, Period, Region, RegionResolver, TableLoader,
};

use crate::utils::{date, fixture, recall};

fn key(region: &str, period: &str) -> ObservationKey {
    ObservationKey::new(Region::new(region), period.parse::<Period>().unwrap())
}

fn environment(entries: &[(&str, &str, Option<f64>, Option<f64>)]) -> EnvironmentTable {
    entries
        .iter()
        .map(|&(region, period, uhii, co2)| {
            let key = key(region, period);
            let observation = EnvironmentalObservation {
                region: key.region.clone(),
                period: key.period,
                uhii,
                co2,
            };
            (key, observation)
        })
        .collect()
}

fn historical(entries: &[(&str, &str, f64)]) -> HistoricalTable {
    entries
        .iter()
        .map(|&(region, period, total_cs)| {
            let key = key(region, period);
            let consultation = HistoricalConsultation {
                region: key.region.clone(),
                period: key.period,
                total_cs,
            };
            (key, consultation)
        })
        .collect()
}

fn join_with(lookback: LookbackWindow, count_national: bool) -> FeatureJoin {
    FeatureJoin::new(JoinConfig { lookback, count_national }, RegionResolver::default())
}

#[test]
fn test_count_risk_matches_window() {
    // 2023-W14 runs from Monday 3 April to Sunday 9 April
    let recalls = vec![
        recall("A", "Bretagne", date(2023, 4, 3)),
        recall("B", "Bretagne", date(2023, 4, 6)),
        recall("C", "bretagne", date(2023, 4, 9)),
        recall("D", "Bretagne", date(2023, 4, 2)),
        recall("E", "Bretagne", date(2023, 4, 10)),
        recall("F", "Normandie", date(2023, 4, 5)),
    ];
    let env = environment(&[("Bretagne", "2023-W14", Some(2.5), Some(410.0))]);

    let output = join_with(LookbackWindow::Weeks(1), true).join(&recalls, &env, &HistoricalTable::new());

    assert_eq!(output.rows.len(), 1);
    let row = &output.rows[0];
    assert_eq!(row.count_risk, 3);
    assert_eq!(row.year, 2023);
    assert_eq!(row.uhii, Some(2.5));
    assert_eq!(row.total_cs, None);
}

#[test]
fn test_longer_lookback_reaches_back() {
    let recalls = vec![
        recall("A", "Bretagne", date(2023, 3, 27)),
        recall("B", "Bretagne", date(2023, 4, 2)),
        recall("C", "Bretagne", date(2023, 4, 9)),
        recall("D", "Bretagne", date(2023, 3, 26)),
    ];
    let env = environment(&[("Bretagne", "2023-W14", Some(2.5), Some(410.0))]);

    let output = join_with(LookbackWindow::Weeks(2), true).join(&recalls, &env, &HistoricalTable::new());
    assert_eq!(output.rows[0].count_risk, 3);
}

#[test]
fn test_national_and_multi_region_recalls() {
    let recalls = vec![
        recall("A", "France entière", date(2023, 4, 4)),
        recall("B", "Normandie, Bretagne", date(2023, 4, 5)),
        recall("C", "Atlantis", date(2023, 4, 5)),
    ];
    let env = environment(&[
        ("Bretagne", "2023-W14", Some(2.5), Some(410.0)),
        ("Occitanie", "2023-W14", Some(3.0), Some(415.0)),
    ]);

    let with_national = join_with(LookbackWindow::Weeks(1), true).join(&recalls, &env, &HistoricalTable::new());
    let counts: Vec<_> = with_national.rows.iter().map(|r| r.count_risk).collect();
    assert_eq!(counts, vec![2, 1]);

    let without_national = join_with(LookbackWindow::Weeks(1), false).join(&recalls, &env, &HistoricalTable::new());
    let counts: Vec<_> = without_national.rows.iter().map(|r| r.count_risk).collect();
    assert_eq!(counts, vec![1, 0]);
}

#[test]
fn test_historical_without_environment_is_incomplete() {
    let env = environment(&[
        ("Bretagne", "2023-W14", Some(2.5), Some(410.0)),
        ("Normandie", "2023-W14", Some(1.8), None),
    ]);
    let hist = historical(&[
        ("Bretagne", "2023-W14", 120.0),
        ("Normandie", "2023-W14", 80.0),
        ("Occitanie", "2023-W14", 95.0),
    ]);

    let output = join_with(LookbackWindow::Weeks(1), true).join(&[], &env, &hist);

    let training: Vec<_> = output.training_rows().collect();
    assert_eq!(training.len(), 1);
    assert_eq!(training[0].region, Region::new("Bretagne"));
    assert_eq!(training[0].total_cs, Some(120.0));

    assert_eq!(output.prediction_rows().len(), 2);
    assert!(output.rows.iter().all(|r| r.region != Region::new("Occitanie")));

    let reasons: Vec<_> = output.incomplete.iter().map(|i| (i.key.region.as_str(), i.reason)).collect();
    assert_eq!(
        reasons,
        vec![
            ("Normandie", IncompleteReason::UnknownEnvironmentalValues),
            ("Occitanie", IncompleteReason::MissingEnvironmental),
        ]
    );
}

#[test]
fn test_join_loaded_fixtures() {
    let loader = TableLoader::default();
    let (env, _) = loader.load_environment(&fixture("environment.csv")).unwrap();
    let (hist, _) = loader.load_historical(&fixture("historical.csv")).unwrap();
    let recalls = vec![recall("A", "Bretagne", date(2023, 4, 12))];

    let output = FeatureJoin::default().join(&recalls, &env, &hist);

    assert_eq!(output.rows.len(), 3);
    let w15 = output.rows.iter().find(|r| r.key() == key("Bretagne", "2023-W15")).unwrap();
    assert_eq!(w15.count_risk, 1);
    assert!(output.incomplete.iter().any(|i| i.key == key("Occitanie", "2023-W14")));
}

#[test]
fn test_default_join_counts_whole_year() {
    let recalls = vec![
        recall("A", "Bretagne", date(2023, 2, 1)),
        recall("B", "Bretagne", date(2023, 6, 1)),
        recall("C", "Bretagne", date(2023, 11, 1)),
        recall("D", "Bretagne", date(2022, 12, 31)),
        recall("E", "Bretagne", date(2024, 1, 1)),
    ];
    let env = environment(&[("Bretagne", "2023", Some(2.5), Some(410.0))]);

    let output = FeatureJoin::default().join(&recalls, &env, &HistoricalTable::new());

    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows[0].count_risk, 3);
    assert_eq!(output.rows[0].year, 2023);
}

#[test]
fn test_oversized_lookback_counts_everything_before() {
    let recalls = vec![
        recall("A", "Bretagne", date(1990, 1, 1)),
        recall("B", "Bretagne", date(2023, 4, 9)),
        recall("C", "Bretagne", date(2023, 4, 10)),
    ];
    let env = environment(&[("Bretagne", "2023-W14", Some(2.5), Some(410.0))]);

    let output = join_with(LookbackWindow::Weeks(20_000_000), true).join(&recalls, &env, &HistoricalTable::new());
    assert_eq!(output.rows[0].count_risk, 2);
}
