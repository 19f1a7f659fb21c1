//! Domain models for the recall pipeline
//!
//! Recall records come from the extractor, observations from the tabular
//! loader, and feature rows from the join that combines them.

pub mod feature;
pub mod observation;
pub mod period;
pub mod recall;
pub mod region;

pub use feature::{FeatureRow, IncompleteKey, IncompleteReason};
pub use observation::{EnvironmentalObservation, HistoricalConsultation, ObservationKey};
pub use period::{LookbackWindow, Period};
pub use recall::{RecallKey, RecallRecord, RiskLevel};
pub use region::{Region, RegionResolver, RegionScope};
