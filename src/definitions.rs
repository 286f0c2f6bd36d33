//! Step definitions: a mapping from sequence key to an ordered list of steps.

use crate::error::{Result, WalkthroughError};
use crate::step::Step;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where definitions are read from.
#[derive(Debug, Clone)]
pub enum DefinitionSource {
    /// JSON text held in memory.
    Inline(String),
    /// A JSON file on disk.
    File(PathBuf),
}

impl DefinitionSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    pub fn inline(json: impl Into<String>) -> Self {
        Self::Inline(json.into())
    }
}

impl fmt::Display for DefinitionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("<inline>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// All known sequences, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    sequences: BTreeMap<String, Vec<Step>>,
}

impl Definitions {
    /// Parse definitions from a JSON object of `key -> [step, ...]`.
    ///
    /// # Example
    ///
    /// ```
    /// use walkthrough::Definitions;
    ///
    /// let defs = Definitions::from_json_str(r#"{"intro": [{"text": "Hi"}]}"#).unwrap();
    /// assert_eq!(defs.get("intro").unwrap().len(), 1);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let sequences = serde_json::from_str(json)?;
        Ok(Self { sequences })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Read definitions from `source`, wrapping any failure as
    /// [`WalkthroughError::DefinitionLoad`].
    pub fn load(source: &DefinitionSource) -> Result<Self> {
        let loaded = match source {
            DefinitionSource::Inline(json) => Self::from_json_str(json),
            DefinitionSource::File(path) => Self::from_file(path),
        };
        loaded.map_err(|e| WalkthroughError::DefinitionLoad {
            origin: source.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, steps: Vec<Step>) {
        self.sequences.insert(key.into(), steps);
    }

    pub fn get(&self, key: &str) -> Option<&[Step]> {
        self.sequences.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl FromIterator<(String, Vec<Step>)> for Definitions {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Step>)>>(iter: I) -> Self {
        Self {
            sequences: iter.into_iter().collect(),
        }
    }
}
