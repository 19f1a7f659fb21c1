//! Recall extraction
//!
//! Pages through the public recall listing for one product category, reads
//! every entry, follows each entry's detail page for its sales area and
//! yields one `RecallRecord` per valid entry. Records come out lazily, most
//! recent first, in the order the site lists them.

pub mod parse;
pub mod source;

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::thread;
use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use indicatif::ProgressBar;
use url::Url;

use crate::config::ExtractorConfig;
use crate::error::{PipelineError, Result};
use crate::models::{RecallRecord, RiskLevel};
use crate::utils::date::parse_date_string;
use crate::utils::logging::{create_page_progress_bar, finish_progress_bar, log_operation_complete, log_warning};

pub use parse::{ListingEntry, parse_listing, parse_sales_area};
pub use source::{FileSource, HttpSource, PageSource};

/// Counters for one extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Listing pages fetched and parsed
    pub pages: usize,
    /// Entries found on those pages
    pub entries: usize,
    /// Records yielded
    pub emitted: usize,
    /// Entries dropped for a missing or unreadable field
    pub rejected: usize,
    /// Entries outside the configured date range
    pub out_of_range: usize,
    /// Entries dropped because their detail page failed
    pub detail_failures: usize,
}

/// Why a single listing entry did not become a record
#[derive(Debug)]
enum Rejection {
    MissingTitle,
    MissingDate,
    BadDate(String),
    OutOfRange(NaiveDate),
    DetailUnavailable(String),
    /// The detail fetch failed in transport; ends the extraction
    Transport(PipelineError),
}

/// Extractor over a page source
#[derive(Debug)]
pub struct RecallExtractor<S> {
    source: S,
    config: ExtractorConfig,
    base: Url,
}

impl RecallExtractor<HttpSource> {
    /// Extractor over the live site
    pub fn http(config: ExtractorConfig) -> Result<Self> {
        let source = HttpSource::new(&config)?;
        Self::new(source, config)
    }
}

impl<S: PageSource> RecallExtractor<S> {
    pub fn new(source: S, config: ExtractorConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| PipelineError::validation(format!("invalid base URL '{}': {e}", config.base_url)))?;
        if config.first_page == 0 || config.first_page > config.last_page {
            return Err(PipelineError::validation(format!(
                "invalid page range {}..={}",
                config.first_page, config.last_page
            )));
        }
        if let Some((from, to)) = config.date_range {
            if from > to {
                return Err(PipelineError::validation(format!("date range {from}..={to} is empty")));
            }
        }
        Ok(Self { source, config, base })
    }

    #[must_use]
    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Start a lazy extraction, stamping records with the current time
    #[must_use]
    pub fn extract(&self) -> RecallStream<'_, S> {
        self.extract_at(Utc::now().naive_utc())
    }

    /// Start a lazy extraction, stamping records with `scraped_at`
    #[must_use]
    pub fn extract_at(&self, scraped_at: NaiveDateTime) -> RecallStream<'_, S> {
        let pages = u64::from(self.config.last_page - self.config.first_page + 1);
        RecallStream {
            extractor: self,
            next_page: self.config.first_page,
            pending: VecDeque::new(),
            failure: None,
            stats: ExtractionStats::default(),
            scraped_at,
            progress: create_page_progress_bar(pages, self.config.show_progress),
            started: Instant::now(),
            done: false,
        }
    }

    /// Turn one listing entry into a record, fetching its detail page
    fn build_record(&self, entry: ListingEntry, scraped_at: NaiveDateTime) -> std::result::Result<RecallRecord, Rejection> {
        let title = entry.title.ok_or(Rejection::MissingTitle)?;
        let date_text = entry.date_text.ok_or(Rejection::MissingDate)?;
        let date = parse_date_string(&date_text, &self.config.date_formats)
            .ok_or_else(|| Rejection::BadDate(date_text.clone()))?;

        if let Some((from, to)) = self.config.date_range {
            if date < from || date > to {
                return Err(Rejection::OutOfRange(date));
            }
        }

        let region = match (&entry.link, self.config.fetch_details) {
            (Some(link), true) => {
                let area = self.fetch_sales_area(link);
                pause(self.config.detail_delay());
                area?
            }
            _ => String::new(),
        };

        let risk_level = RiskLevel::classify(entry.risks.as_deref().unwrap_or_default());
        let mut record = RecallRecord::new(
            title,
            entry.maker.unwrap_or_default(),
            date,
            risk_level,
            region,
        )
        .scraped_at(scraped_at);
        if let Some(reason) = entry.reason {
            record = record.with_reason(reason);
        }
        if let Some(link) = entry.link {
            record = record.with_link(link);
        }
        Ok(record)
    }

    fn fetch_sales_area(&self, link: &str) -> std::result::Result<String, Rejection> {
        match self.source.fetch(link) {
            Ok(Some(html)) => Ok(parse_sales_area(&html).unwrap_or_default()),
            Ok(None) => Err(Rejection::DetailUnavailable(format!("{link}: not found"))),
            Err(e) => Err(Rejection::Transport(e)),
        }
    }
}

/// Lazy sequence of extracted records
///
/// A listing page is fetched only when the records of the previous one have
/// been consumed. The sequence ends after the last configured page, at the
/// first missing or empty page, or right after yielding an `IngestionError`.
/// A transport failure on a detail page is yielded after the records that
/// precede it on the same listing page.
pub struct RecallStream<'a, S> {
    extractor: &'a RecallExtractor<S>,
    next_page: u32,
    pending: VecDeque<RecallRecord>,
    failure: Option<PipelineError>,
    stats: ExtractionStats,
    scraped_at: NaiveDateTime,
    progress: ProgressBar,
    started: Instant,
    done: bool,
}

impl<S: PageSource> RecallStream<'_, S> {
    /// Counters so far
    #[must_use]
    pub const fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    /// Fetch and parse one listing page into `pending`
    ///
    /// Returns `false` when the page marks the end of the listing.
    fn load_page(&mut self, page: u32) -> Result<bool> {
        let config = &self.extractor.config;
        let url = config.listing_url(page);

        let Some(html) = self.extractor.source.fetch(&url)? else {
            log::info!("Listing page {page} not found, stopping");
            return Ok(false);
        };

        let entries = parse_listing(&html, &self.extractor.base);
        if entries.is_empty() {
            log::info!("Listing page {page} has no entries, stopping");
            return Ok(false);
        }

        self.stats.pages += 1;
        self.stats.entries += entries.len();

        for entry in entries {
            match self.extractor.build_record(entry, self.scraped_at) {
                Ok(record) => self.pending.push_back(record),
                Err(Rejection::OutOfRange(date)) => {
                    log::trace!("Skipping recall dated {date}, outside the configured range");
                    self.stats.out_of_range += 1;
                }
                Err(Rejection::Transport(e)) => {
                    self.stats.detail_failures += 1;
                    return Err(e);
                }
                Err(Rejection::DetailUnavailable(reason)) => {
                    log_warning("Detail page unavailable, entry dropped", Some(&reason));
                    self.stats.detail_failures += 1;
                    self.stats.rejected += 1;
                }
                Err(rejection) => {
                    let target = format!("page {page}: {rejection:?}");
                    log_warning("Malformed listing entry dropped", Some(&target));
                    self.stats.rejected += 1;
                }
            }
        }

        self.progress.inc(1);
        self.progress.set_message(format!("{} recalls", self.stats.emitted + self.pending.len()));
        pause(config.page_delay());
        Ok(true)
    }

    fn finish(&mut self) {
        self.done = true;
        finish_progress_bar(&self.progress, Some("done"));
        log_operation_complete(
            "extracted",
            format!("{} listing pages", self.stats.pages),
            self.stats.emitted,
            Some(self.started.elapsed()),
        );
        if self.stats.rejected > 0 || self.stats.out_of_range > 0 {
            log::info!(
                "{} entries rejected ({} detail failures), {} outside the date range",
                self.stats.rejected,
                self.stats.detail_failures,
                self.stats.out_of_range
            );
        }
    }
}

impl<S: PageSource> Iterator for RecallStream<'_, S> {
    type Item = Result<RecallRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.stats.emitted += 1;
                return Some(Ok(record));
            }
            if let Some(e) = self.failure.take() {
                return Some(Err(e));
            }
            if self.done {
                return None;
            }
            if self.next_page > self.extractor.config.last_page {
                self.finish();
                return None;
            }

            let page = self.next_page;
            self.next_page += 1;
            match self.load_page(page) {
                Ok(true) => {}
                Ok(false) => self.finish(),
                Err(e) => {
                    self.failure = Some(e);
                    self.finish();
                }
            }
        }
    }
}

impl<S: PageSource> FusedIterator for RecallStream<'_, S> {}

fn pause(delay: std::time::Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
