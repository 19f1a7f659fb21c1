//! Fitted label encoder for the region feature

use std::io::BufReader;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::util::safe_open_file;
use crate::error::{PipelineError, Result};
use crate::models::region::normalize_label;

/// Maps each known category to its position in the fitted class list
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    field: String,
    classes: Vec<String>,
    codes: FxHashMap<String, u32>,
    normalized: FxHashMap<String, u32>,
}

/// On-disk form: `{"classes": ["Auvergne-Rhône-Alpes", "Bretagne", ...]}`
#[derive(Debug, Serialize, Deserialize)]
struct EncoderFile {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Encoder over `classes`, where a class's code is its index
    pub fn new(field: impl Into<String>, classes: Vec<String>) -> Result<Self> {
        let field = field.into();
        if classes.is_empty() {
            return Err(PipelineError::schema(format!("{field} encoder"), "no classes"));
        }

        let mut codes = FxHashMap::default();
        let mut normalized = FxHashMap::default();
        for (idx, class) in classes.iter().enumerate() {
            let code = u32::try_from(idx)
                .map_err(|_| PipelineError::schema(format!("{field} encoder"), "too many classes"))?;
            if codes.insert(class.clone(), code).is_some() {
                return Err(PipelineError::schema(
                    format!("{field} encoder"),
                    format!("class '{class}' listed twice"),
                ));
            }
            normalized.entry(normalize_label(class)).or_insert(code);
        }

        Ok(Self {
            field,
            classes,
            codes,
            normalized,
        })
    }

    /// Load an encoder artifact
    pub fn from_json_file(field: impl Into<String>, path: &Path) -> Result<Self> {
        let file = safe_open_file(path, "encoder artifact")?;
        let raw: EncoderFile = serde_json::from_reader(BufReader::new(file))?;
        Self::new(field, raw.classes)
    }

    /// Fitted classes, in code order
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code of a category
    ///
    /// An exact match wins; otherwise the value is compared case, accent and
    /// punctuation-insensitively. Anything else is an `UnknownCategory`.
    pub fn encode(&self, value: &str) -> Result<u32> {
        let value = value.trim();
        self.codes
            .get(value)
            .or_else(|| self.normalized.get(&normalize_label(value)))
            .copied()
            .ok_or_else(|| PipelineError::UnknownCategory {
                field: self.field.clone(),
                value: value.to_string(),
            })
    }
}
