use std::cell::Cell;

use onehealth::extract::{FileSource, PageSource, RecallExtractor};
use onehealth::{ExtractorConfig, PipelineError, Result, RiskLevel};

use crate::utils::{date, offline_config, pages_dir, timestamp};

#[test]
fn test_extracts_saved_pages() {
    let extractor = RecallExtractor::new(FileSource::new(pages_dir()), offline_config()).unwrap();

    let mut stream = extractor.extract_at(timestamp("2025-03-01 12:00:00"));
    let records: Vec<_> = stream.by_ref().collect::<Result<_>>().unwrap();

    let products: Vec<_> = records.iter().map(|r| r.product.as_str()).collect();
    assert_eq!(products, ["Saucisson sec", "Rillettes de porc", "Merguez"]);

    let saucisson = &records[0];
    assert_eq!(saucisson.brand, "Maison Dupont");
    assert_eq!(saucisson.date, date(2025, 2, 14));
    assert_eq!(saucisson.risk_level, RiskLevel::Listeria);
    assert_eq!(saucisson.region, "Bretagne");
    assert_eq!(saucisson.reason.as_deref(), Some("Présence de Listeria"));
    assert_eq!(
        saucisson.link.as_deref(),
        Some("https://rappel.conso.gouv.fr/fiche-rappel/101/Interne")
    );
    assert_eq!(saucisson.scraped_at, timestamp("2025-03-01 12:00:00"));

    assert_eq!(records[1].region, "France entière");
    assert_eq!(records[2].region, "Normandie, Bretagne");
    assert_eq!(records[2].risk_level, RiskLevel::EscherichiaColi);

    // Page 3 is missing, which ends the listing
    let stats = *stream.stats();
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.entries, 5);
    assert_eq!(stats.emitted, 3);
    // The undated entry and the entry whose detail page is missing
    assert_eq!(stats.rejected, 2);
    assert_eq!(stats.detail_failures, 1);
}

#[test]
fn test_date_range_filter() {
    let config = ExtractorConfig {
        date_range: Some((date(2025, 1, 1), date(2025, 12, 31))),
        ..offline_config()
    };
    let extractor = RecallExtractor::new(FileSource::new(pages_dir()), config).unwrap();

    let mut stream = extractor.extract();
    let records: Vec<_> = stream.by_ref().collect::<Result<_>>().unwrap();

    assert!(records.iter().all(|r| r.date >= date(2025, 1, 1)));
    assert_eq!(records.len(), 2);
    assert_eq!(stream.stats().out_of_range, 1);
}

#[test]
fn test_without_detail_pages() {
    let config = ExtractorConfig {
        fetch_details: false,
        ..offline_config()
    };
    let extractor = RecallExtractor::new(FileSource::new(pages_dir()), config).unwrap();

    let records: Vec<_> = extractor.extract().collect::<Result<_>>().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.region.is_empty()));
}

/// Serves the saved pages, then fails every request after `budget` fetches
struct FlakySource {
    inner: FileSource,
    budget: Cell<usize>,
}

impl PageSource for FlakySource {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        if self.budget.get() == 0 {
            return Err(PipelineError::ingestion(url, "connection reset"));
        }
        self.budget.set(self.budget.get() - 1);
        self.inner.fetch(url)
    }
}

#[test]
fn test_transport_failure_is_yielded_once() {
    // Listing page 1 and its three detail pages succeed; page 2 fails
    let source = FlakySource {
        inner: FileSource::new(pages_dir()),
        budget: Cell::new(3),
    };
    let extractor = RecallExtractor::new(source, offline_config()).unwrap();

    let results: Vec<_> = extractor.extract().collect();
    let (ok, err): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);

    assert_eq!(ok.len(), 2);
    assert_eq!(err.len(), 1);
    let error = err.into_iter().next().unwrap().unwrap_err();
    assert!(error.is_retryable());
    assert!(matches!(error, PipelineError::Ingestion { .. }));
}

/// Serves the saved pages but fails in transport for URLs containing `failing`
struct DetailOutage {
    inner: FileSource,
    failing: &'static str,
}

impl PageSource for DetailOutage {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        if url.contains(self.failing) {
            return Err(PipelineError::ingestion(url, "connection timed out"));
        }
        self.inner.fetch(url)
    }
}

#[test]
fn test_detail_transport_failure_ends_extraction() {
    let source = DetailOutage {
        inner: FileSource::new(pages_dir()),
        failing: "/fiche-rappel/",
    };
    let extractor = RecallExtractor::new(source, offline_config()).unwrap();

    let mut stream = extractor.extract();
    let results: Vec<_> = stream.by_ref().collect();

    assert_eq!(results.len(), 1);
    let error = results.into_iter().next().unwrap().unwrap_err();
    assert!(error.is_retryable());
    assert!(matches!(error, PipelineError::Ingestion { .. }));
    assert_eq!(stream.stats().emitted, 0);
    assert_eq!(stream.stats().detail_failures, 1);
    assert!(stream.next().is_none());
}

#[test]
fn test_records_before_detail_failure_are_kept() {
    let source = DetailOutage {
        inner: FileSource::new(pages_dir()),
        failing: "/fiche-rappel/102/",
    };
    let extractor = RecallExtractor::new(source, offline_config()).unwrap();

    let results: Vec<_> = extractor.extract().collect();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().product, "Saucisson sec");
    assert!(matches!(results[1], Err(PipelineError::Ingestion { .. })));

    // The same failure surfaces through a collecting caller
    let collected: Result<Vec<_>> = extractor.extract().collect();
    assert!(collected.is_err());
}
