//! Region identifiers and free-text region resolution
//!
//! Recall pages describe where a product was sold in free text
//! ("France entière", "Bretagne, Pays de la Loire", "Ile de France").
//! `RegionResolver` maps that text onto the closed set of canonical regions
//! the environmental data and the trained encoder are keyed by.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Canonical region name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Wrap a canonical region name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Where a recall applies, once its region text has been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionScope {
    /// Sold nationwide
    National,
    /// Sold in one or more known regions
    Regions(SmallVec<[Region; 2]>),
    /// Text that maps to no known region
    Unresolved(String),
}

/// The 18 French administrative regions (2016 boundaries)
pub const FRENCH_REGIONS: [&str; 18] = [
    "Auvergne-Rhône-Alpes",
    "Bourgogne-Franche-Comté",
    "Bretagne",
    "Centre-Val de Loire",
    "Corse",
    "Grand Est",
    "Guadeloupe",
    "Guyane",
    "Hauts-de-France",
    "Île-de-France",
    "La Réunion",
    "Martinique",
    "Mayotte",
    "Normandie",
    "Nouvelle-Aquitaine",
    "Occitanie",
    "Pays de la Loire",
    "Provence-Alpes-Côte d'Azur",
];

/// Former region names and common abbreviations, mapped to the current region
const FRENCH_REGION_ALIASES: [(&str, &str); 26] = [
    ("idf", "Île-de-France"),
    ("paris", "Île-de-France"),
    ("paca", "Provence-Alpes-Côte d'Azur"),
    ("reunion", "La Réunion"),
    ("centre", "Centre-Val de Loire"),
    ("ara", "Auvergne-Rhône-Alpes"),
    ("auvergne", "Auvergne-Rhône-Alpes"),
    ("rhone alpes", "Auvergne-Rhône-Alpes"),
    ("bfc", "Bourgogne-Franche-Comté"),
    ("bourgogne", "Bourgogne-Franche-Comté"),
    ("franche comte", "Bourgogne-Franche-Comté"),
    ("alsace", "Grand Est"),
    ("lorraine", "Grand Est"),
    ("champagne ardenne", "Grand Est"),
    ("nord pas de calais", "Hauts-de-France"),
    ("picardie", "Hauts-de-France"),
    ("basse normandie", "Normandie"),
    ("haute normandie", "Normandie"),
    ("aquitaine", "Nouvelle-Aquitaine"),
    ("limousin", "Nouvelle-Aquitaine"),
    ("poitou charentes", "Nouvelle-Aquitaine"),
    ("languedoc roussillon", "Occitanie"),
    ("midi pyrenees", "Occitanie"),
    ("guyane francaise", "Guyane"),
    ("ile de la reunion", "La Réunion"),
    ("corse du sud", "Corse"),
];

/// Phrases meaning "sold everywhere"
const NATIONAL_MARKERS: [&str; 6] = [
    "france entiere",
    "toute la france",
    "france",
    "france metropolitaine",
    "national",
    "territoire national",
];

/// Resolves free-text region descriptions to canonical regions
#[derive(Debug, Clone)]
pub struct RegionResolver {
    regions: Vec<Region>,
    lookup: FxHashMap<String, Region>,
}

impl Default for RegionResolver {
    fn default() -> Self {
        Self::french_regions()
    }
}

impl RegionResolver {
    /// Resolver over an arbitrary vocabulary, without aliases
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut regions: Vec<Region> = names.into_iter().map(|n| Region::new(n.as_ref())).collect();
        regions.sort();
        regions.dedup();

        let lookup = regions
            .iter()
            .map(|region| (normalize_label(region.as_str()), region.clone()))
            .collect();

        Self { regions, lookup }
    }

    /// Resolver over the French regions, including former region names
    #[must_use]
    pub fn french_regions() -> Self {
        let mut resolver = Self::from_names(FRENCH_REGIONS);
        for (alias, canonical) in FRENCH_REGION_ALIASES {
            resolver = resolver.with_alias(alias, canonical);
        }
        resolver
    }

    /// Register an extra spelling for a known region; unknown targets are ignored
    #[must_use]
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        let target = self.lookup.get(&normalize_label(canonical)).cloned();
        match target {
            Some(region) => {
                self.lookup.insert(normalize_label(alias), region);
            }
            None => log::warn!("Alias '{alias}' points at unknown region '{canonical}'"),
        }
        self
    }

    /// Canonical regions, sorted
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Look up a single region name or alias
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<&Region> {
        self.lookup.get(&normalize_label(text))
    }

    /// Resolve a free-text sales area
    ///
    /// The text may list several regions separated by commas, semicolons,
    /// slashes or line breaks. Parts that match nothing are dropped as long as
    /// at least one part resolves.
    #[must_use]
    pub fn resolve(&self, text: &str) -> RegionScope {
        let mut found: SmallVec<[Region; 2]> = SmallVec::new();

        for part in text.split([',', ';', '/', '\n', '|']) {
            let key = normalize_label(part);
            if key.is_empty() {
                continue;
            }
            if NATIONAL_MARKERS.contains(&key.as_str()) {
                return RegionScope::National;
            }
            match self.lookup.get(&key) {
                Some(region) if !found.contains(region) => found.push(region.clone()),
                Some(_) => {}
                None => log::debug!("Region fragment '{}' did not resolve", part.trim()),
            }
        }

        if found.is_empty() {
            RegionScope::Unresolved(text.trim().to_string())
        } else {
            found.sort();
            RegionScope::Regions(found)
        }
    }
}

/// Normalise a label for matching: lowercase, French diacritics folded,
/// punctuation turned into spaces, whitespace collapsed
#[must_use]
pub fn normalize_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = true;

    for ch in s.chars().flat_map(char::to_lowercase) {
        let folded: &str = match ch {
            'à' | 'â' | 'ä' | 'á' => "a",
            'ç' => "c",
            'é' | 'è' | 'ê' | 'ë' => "e",
            'î' | 'ï' | 'í' => "i",
            'ô' | 'ö' | 'ó' => "o",
            'ù' | 'û' | 'ü' | 'ú' => "u",
            'ÿ' => "y",
            'œ' => "oe",
            'æ' => "ae",
            '-' | '\'' | '\u{2019}' | '_' | '.' | ':' | '(' | ')' => " ",
            c if c.is_whitespace() => " ",
            _ => {
                out.push(ch);
                prev_space = false;
                continue;
            }
        };

        if folded == " " {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push_str(folded);
            prev_space = false;
        }
    }

    out.trim_end().to_string()
}
