//! Configuration for the pipeline.
//!
//! Every section has production defaults; a JSON file can override any
//! subset of fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::error::util::safe_open_file;
use crate::models::period::LookbackWindow;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub loader: LoaderConfig,
    pub join: JoinConfig,
    pub paths: StorePaths,
}

impl PipelineConfig {
    /// Read a JSON config file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = safe_open_file(path, "pipeline configuration")?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Configuration for the recall extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Site root; listing and detail links are resolved against it
    pub base_url: String,
    /// Category listed at `/categorie/{id}/{page}` (94 = meats)
    pub category_id: u32,
    /// First listing page (1-based)
    pub first_page: u32,
    /// Last listing page, inclusive
    pub last_page: u32,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Pause after each listing page, in milliseconds
    pub page_delay_ms: u64,
    /// Pause after each detail page, in milliseconds
    pub detail_delay_ms: u64,
    /// Fetch each recall's detail page to read its sales area
    pub fetch_details: bool,
    /// Keep only recalls published in this inclusive range
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub user_agent: String,
    /// Draw a progress bar while paging
    pub show_progress: bool,
    pub date_formats: DateFormatConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rappel.conso.gouv.fr".to_string(),
            category_id: 94,
            first_page: 1,
            last_page: 209,
            timeout_ms: 30_000,
            page_delay_ms: 1_000,
            detail_delay_ms: 500,
            fetch_details: true,
            date_range: None,
            user_agent: concat!("onehealth/", env!("CARGO_PKG_VERSION")).to_string(),
            show_progress: true,
            date_formats: DateFormatConfig::default(),
        }
    }
}

impl ExtractorConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    #[must_use]
    pub const fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    /// Listing URL for one page of the configured category
    #[must_use]
    pub fn listing_url(&self, page: u32) -> String {
        format!(
            "{}/categorie/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.category_id,
            page
        )
    }

    /// Configuration that never sleeps and never draws, for local sources
    #[must_use]
    pub fn offline(mut self) -> Self {
        self.page_delay_ms = 0;
        self.detail_delay_ms = 0;
        self.show_progress = false;
        self
    }
}

/// Date format handling for scraped timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormatConfig {
    /// Date-time formats tried first
    pub datetime_formats: Vec<String>,
    /// Date-only formats tried next
    pub date_formats: Vec<String>,
    /// Enable heuristic format detection
    pub enable_format_detection: bool,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            datetime_formats: vec![
                "%d/%m/%Y %H:%M:%S".to_string(), // Listing pages: 14/02/2025 15:43:31
                "%d/%m/%Y %H:%M".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
            ],
            date_formats: vec![
                "%d/%m/%Y".to_string(), // 14/02/2025
                "%Y-%m-%d".to_string(), // ISO format: 2025-02-14
                "%d.%m.%Y".to_string(),
                "%d-%m-%Y".to_string(),
            ],
            enable_format_detection: true,
        }
    }
}

/// Configuration for the tabular loader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Abort the load when a key repeats with conflicting values
    pub fail_on_conflict: bool,
    /// Rows per record batch when decoding
    pub batch_size: usize,
    /// CSV field delimiter
    pub delimiter: char,
    /// Log every rejected row, not just the totals
    pub log_rejections: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fail_on_conflict: true,
            batch_size: 8192,
            delimiter: ',',
            log_rejections: true,
        }
    }
}

/// Configuration for the feature join
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Recall dates counted for each period
    pub lookback: LookbackWindow,
    /// Count nationwide recalls in every region
    pub count_national: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            lookback: LookbackWindow::default(),
            count_national: true,
        }
    }
}

/// Locations of persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorePaths {
    pub data_dir: PathBuf,
    pub recalls: String,
    pub environment: String,
    pub historical: String,
    pub model: String,
    pub encoder: String,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            recalls: "rappel_conso_viandes.csv".to_string(),
            environment: "environment.csv".to_string(),
            historical: "consultations.csv".to_string(),
            model: "model.json".to_string(),
            encoder: "region_encoder.json".to_string(),
        }
    }
}

impl StorePaths {
    /// Resolve a configured file name against the data directory
    #[must_use]
    pub fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    #[must_use]
    pub fn recalls_path(&self) -> PathBuf {
        self.resolve(&self.recalls)
    }

    #[must_use]
    pub fn environment_path(&self) -> PathBuf {
        self.resolve(&self.environment)
    }

    #[must_use]
    pub fn historical_path(&self) -> PathBuf {
        self.resolve(&self.historical)
    }

    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model)
    }

    #[must_use]
    pub fn encoder_path(&self) -> PathBuf {
        self.resolve(&self.encoder)
    }
}

impl LoaderConfig {
    /// Delimiter as the single byte the CSV readers expect
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| PipelineError::validation(format!("delimiter '{}' is not ASCII", self.delimiter)))
    }
}
