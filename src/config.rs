//! Configuration documents.
//!
//! A language is described by two JSON documents. The phonetics document holds
//! the segment tree; it is kept as a raw [`serde_json::Value`] because its shape
//! is arbitrary nesting and [`FeatureIndex::build`](crate::FeatureIndex::build)
//! walks it with precise error paths.
//!
//! ```json
//! { "segments": { "consonant": { "stop": { "voiceless-stop": ["p", "t", "k"] } } } }
//! ```
//!
//! The language document is fully typed:
//!
//! ```json
//! {
//!   "boundaries": ["onset"],
//!   "syllables": [[1, 2.0], [2, 5.0]],
//!   "start": "onset",
//!   "states": { "onset": { "nucleus": [["p", 3.0], [null, 1.0]] } },
//!   "changes": [{ "name": "lenition", "rules": ["p->b/a_a"] }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConfigError;
use crate::generator::DEFAULT_MAX_SYLLABLE_STEPS;

/// The phonetics document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneticsConfig {
    /// Nested feature tree; leaves are lists of segment literals.
    pub segments: Value,
}

/// One named change: rule strings applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeConfig {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Outgoing transitions of every state: `state -> next -> [(output, weight)]`.
pub type StateConfig = BTreeMap<String, BTreeMap<String, Vec<(Option<String>, f64)>>>;

/// The language document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub boundaries: Vec<String>,
    /// `(syllable count, weight)` pairs.
    pub syllables: Vec<(u32, f64)>,
    pub start: String,
    pub states: StateConfig,
    #[serde(default)]
    pub changes: Vec<ChangeConfig>,
    #[serde(default = "default_max_syllable_steps")]
    pub max_syllable_steps: usize,
}

fn default_max_syllable_steps() -> usize {
    DEFAULT_MAX_SYLLABLE_STEPS
}

impl PhoneticsConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read(path.as_ref())?.parse()
    }
}

impl FromStr for PhoneticsConfig {
    type Err = ConfigError;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(json).map_err(|source| ConfigError::Json { document: "phonetics", source })
    }
}

impl LanguageConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read(path.as_ref())?.parse()
    }
}

impl FromStr for LanguageConfig {
    type Err = ConfigError;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(json).map_err(|source| ConfigError::Json { document: "language", source })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}
