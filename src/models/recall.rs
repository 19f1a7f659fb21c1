//! Recall record model
//!
//! One published meat-product recall. Records are created by the extractor
//! (or read back from the persisted CSV) and never mutated; a later scrape of
//! the same recall supersedes the earlier copy through deduplication.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use onehealth_macros::TabularSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::region::normalize_label;

/// Hazard category of a recall, normalised from the "Risques" free text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Listeria,
    Salmonella,
    EscherichiaColi,
    Botulism,
    ForeignBody,
    Allergen,
    Chemical,
    /// Text that matched none of the known hazards, kept verbatim
    ///
    /// Never holds one of the canonical labels when built through `classify`,
    /// which keeps the persisted label unambiguous.
    Other(String),
}

impl RiskLevel {
    const KNOWN: [Self; 7] = [
        Self::Listeria,
        Self::Salmonella,
        Self::EscherichiaColi,
        Self::Botulism,
        Self::ForeignBody,
        Self::Allergen,
        Self::Chemical,
    ];

    /// Classify free text by keyword; unmatched text becomes `Other`
    ///
    /// A canonical label (`e_coli`, `foreign_body`, ...) maps to its own
    /// variant.
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(level) = Self::KNOWN.into_iter().find(|level| level.label() == trimmed) {
            return level;
        }

        let key = normalize_label(text);
        let has_word = |word: &str| key.split(' ').any(|w| w == word);

        if key.contains("listeria") || key.contains("listeriose") {
            Self::Listeria
        } else if key.contains("salmonell") {
            Self::Salmonella
        } else if key.contains("escherichia") || has_word("coli") || has_word("ecoli") || has_word("stec") {
            Self::EscherichiaColi
        } else if key.contains("botuli") || key.contains("clostridium") {
            Self::Botulism
        } else if key.contains("corps etranger")
            || key.contains("morceau")
            || key.contains("fragment")
            || key.contains("verre")
            || key.contains("metal")
        {
            Self::ForeignBody
        } else if key.contains("allergen") || key.contains("allergie") {
            Self::Allergen
        } else if key.contains("chimique") || key.contains("pesticide") || key.contains("oxyde d ethylene") {
            Self::Chemical
        } else {
            Self::Other(text.trim().to_string())
        }
    }

    /// Stable label written to the persisted CSV
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Listeria => "listeria",
            Self::Salmonella => "salmonella",
            Self::EscherichiaColi => "e_coli",
            Self::Botulism => "botulism",
            Self::ForeignBody => "foreign_body",
            Self::Allergen => "allergen",
            Self::Chemical => "chemical",
            Self::Other(text) => text,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::classify(s))
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let Ok(level) = raw.parse::<Self>();
        Ok(level)
    }
}

/// Deduplication key: the same recall seen on two scrapes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecallKey {
    pub product: String,
    pub brand: String,
    pub date: NaiveDate,
    pub region: String,
}

/// One scraped recall event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TabularSchema)]
#[table(name = "recalls")]
pub struct RecallRecord {
    /// Product name (listing title)
    pub product: String,
    /// Brand or manufacturer
    pub brand: String,
    /// Publication date of the recall
    pub date: NaiveDate,
    #[column(kind = "text")]
    pub risk_level: RiskLevel,
    /// Raw sales-area text, resolved against known regions at join time
    pub region: String,
    /// Stated reason for the recall ("Motif")
    #[serde(default)]
    pub reason: Option<String>,
    /// Absolute URL of the recall detail page
    #[serde(default)]
    pub link: Option<String>,
    /// When the scrape that produced this copy started
    #[serde(default = "unix_epoch", deserialize_with = "deserialize_scraped_at")]
    #[column(optional)]
    pub scraped_at: NaiveDateTime,
}

impl RecallRecord {
    /// Create a record with no reason, no link and an epoch scrape time
    #[must_use]
    pub fn new(
        product: impl Into<String>,
        brand: impl Into<String>,
        date: NaiveDate,
        risk_level: RiskLevel,
        region: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into().trim().to_string(),
            brand: brand.into().trim().to_string(),
            date,
            risk_level,
            region: region.into().trim().to_string(),
            reason: None,
            link: None,
            scraped_at: unix_epoch(),
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.reason = (!reason.trim().is_empty()).then(|| reason.trim().to_string());
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        self.link = (!link.is_empty()).then_some(link);
        self
    }

    #[must_use]
    pub fn scraped_at(mut self, scraped_at: NaiveDateTime) -> Self {
        self.scraped_at = scraped_at;
        self
    }

    /// Identity of the recall across scrapes
    #[must_use]
    pub fn key(&self) -> RecallKey {
        RecallKey {
            product: self.product.clone(),
            brand: self.brand.clone(),
            date: self.date,
            region: self.region.clone(),
        }
    }
}

fn unix_epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

fn deserialize_scraped_at<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(unix_epoch()),
        Some(text) => text.parse().map_err(serde::de::Error::custom),
    }
}
