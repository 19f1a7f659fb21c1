//! Recall ingestion, feature join and consultation prediction for the
//! OneHealth early-warning dashboard.
//!
//! Data flows extractor -> recall store -> feature join (with the loaded
//! environmental and historical tables) -> prediction adapter.

// Lets `#[derive(TabularSchema)]` name `::onehealth` from inside this crate
extern crate self as onehealth;

pub mod config;
pub mod error;
pub mod extract;
pub mod join;
pub mod loader;
pub mod models;
pub mod predict;
pub mod schema;
pub mod store;
pub mod utils;

// Core types
pub use config::{ExtractorConfig, JoinConfig, LoaderConfig, PipelineConfig, StorePaths};
pub use error::{PipelineError, Result};
pub use models::{
    EnvironmentalObservation, FeatureRow, HistoricalConsultation, LookbackWindow, ObservationKey, Period,
    RecallRecord, Region, RegionResolver, RiskLevel,
};

// Pipeline stages
pub use extract::{ExtractionStats, FileSource, HttpSource, PageSource, RecallExtractor, RecallStream};
pub use join::{FeatureJoin, JoinOutput, write_feature_csv};
pub use loader::{EnvironmentTable, HistoricalTable, LoadReport, TableLoader};
pub use predict::{PredictionInput, Predictor, TrainedModelArtifact, weekly_rate};
pub use store::{MergeReport, RecallStore, dedup_records};
