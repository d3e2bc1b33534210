//! Scheme dataset — loaded once at startup, shared read-only.
//!
//! File format (`data/schemes.json`):
//! ```json
//! { "schemes": [ { "id": "PM_KISAN", "name_hindi": "…", "eligibility": { … } } ] }
//! ```
//! `category` and `occupation` in the eligibility block accept a single
//! string or a list.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::SchemeError;
use crate::agent_core::state::{Category, Gender, MaritalStatus};

// ─── Types ──────────────────────────────────────────────────────────────────

/// Machine-checkable eligibility predicate. Absent fields impose no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub max_income: Option<f64>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub category: Option<Vec<Category>>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub occupation: Option<Vec<String>>,
    #[serde(default)]
    pub is_student: Option<bool>,
    #[serde(default)]
    pub has_disabilities: Option<bool>,
    #[serde(default)]
    pub marital_status: Option<MaritalStatus>,
}

/// A benefit-program record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub id: String,
    pub name_hindi: String,
    #[serde(default)]
    pub name_english: Option<String>,
    #[serde(default)]
    pub description_hindi: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub eligibility: EligibilityCriteria,
}

impl Scheme {
    /// Localized display name.
    pub fn display_name(&self) -> &str {
        &self.name_hindi
    }

    /// Localized description, falling back to the English one.
    pub fn display_description(&self) -> &str {
        self.description_hindi
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }

    /// Whether `text` names this scheme by id or by either name.
    pub fn is_named_in(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        let id_spoken = self.id.to_lowercase().replace('_', "-");
        [
            Some(self.id.to_lowercase()),
            Some(id_spoken),
            Some(self.name_hindi.to_lowercase()),
            self.name_english.as_ref().map(|n| n.to_lowercase()),
        ]
        .into_iter()
        .flatten()
        .filter(|needle| !needle.is_empty())
        .any(|needle| haystack.contains(&needle))
    }
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    schemes: Vec<Scheme>,
}

/// Where the loaded schemes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSource {
    File,
    BuiltIn,
}

/// Immutable, shareable scheme list.
#[derive(Debug, Clone)]
pub struct SchemeDataset {
    schemes: Arc<Vec<Scheme>>,
    source: DatasetSource,
}

impl SchemeDataset {
    pub fn new(schemes: Vec<Scheme>) -> Self {
        Self {
            schemes: Arc::new(schemes),
            source: DatasetSource::File,
        }
    }

    /// Load the dataset from `path`.
    ///
    /// A missing file falls back to the built-in single-scheme dataset
    /// (logged, not an error). An unreadable or malformed file also falls
    /// back, logged at error level.
    pub fn load(path: &Path) -> Self {
        match Self::load_strict(path) {
            Ok(dataset) => {
                tracing::info!(
                    path = %path.display(),
                    schemes = dataset.len(),
                    "scheme dataset loaded"
                );
                dataset
            }
            Err(SchemeError::NotFound { .. }) => {
                tracing::warn!(path = %path.display(), "scheme dataset not found, using built-in dataset");
                Self::built_in()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "scheme dataset unusable, using built-in dataset");
                Self::built_in()
            }
        }
    }

    /// Load the dataset from `path`, surfacing every failure.
    pub fn load_strict(path: &Path) -> Result<Self, SchemeError> {
        if !path.exists() {
            return Err(SchemeError::NotFound {
                path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| SchemeError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: DatasetFile = serde_json::from_str(&raw).map_err(|e| SchemeError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(file.schemes))
    }

    /// The documented minimal dataset: PM-KISAN only.
    pub fn built_in() -> Self {
        let scheme = Scheme {
            id: "PM_KISAN".to_string(),
            name_hindi: "पीएम-किसान".to_string(),
            name_english: Some("PM-KISAN".to_string()),
            description_hindi: Some("किसानों के लिए वित्तीय सहायता".to_string()),
            description: Some("Income support for farmer families".to_string()),
            benefits: Some("सालाना 6000 रुपये".to_string()),
            eligibility: EligibilityCriteria {
                min_age: Some(18),
                max_income: Some(200_000.0),
                occupation: Some(vec!["farmer".to_string(), "agriculture".to_string()]),
                ..Default::default()
            },
        };
        Self {
            schemes: Arc::new(vec![scheme]),
            source: DatasetSource::BuiltIn,
        }
    }

    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    pub fn get(&self, scheme_id: &str) -> Option<&Scheme> {
        self.schemes.iter().find(|s| s.id == scheme_id)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    pub fn source(&self) -> DatasetSource {
        self.source
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Accept `"x"` or `["x", "y"]`.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(v)) => Some(vec![v]),
        Some(OneOrMany::Many(v)) => Some(v),
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
