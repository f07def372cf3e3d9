//! Ordered class names, index-aligned with the model's output vector.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LabelError, ModelLoadError};

/// Class names in the order the screening model was trained with.
pub const DEFAULT_CLASS_NAMES: [&str; 8] = [
    "Calculus",
    "Caries",
    "Gingivitis",
    "Hypodontia",
    "Normal_Mouth",
    "Oral_Cancer",
    "Tooth Discoloration",
    "Ulcers",
];

/// Accepted label file layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    Wrapped { class_names: Vec<String> },
    Bare(Vec<String>),
}

/// Validated, immutable label set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Creates a label set, rejecting empty, blank or duplicate names.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn new(names: Vec<String>) -> Result<Self, LabelError> {
        if names.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(LabelError::Blank(index));
            }
            if !seen.insert(name.as_str()) {
                return Err(LabelError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Parses `{"class_names": [...]}` or a bare JSON array.
    ///
    /// # Errors
    ///
    /// Returns `LabelError::Parse` for malformed JSON, or the validation failure.
    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let file: LabelFile = serde_json::from_str(json)?;
        let names = match file {
            LabelFile::Wrapped { class_names } => class_names,
            LabelFile::Bare(names) => names,
        };
        Self::new(names)
    }

    /// Loads and validates a label file.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError::Labels` if the file is missing, unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        debug!("Loading class names from {}", path.display());

        std::fs::read_to_string(path)
            .map_err(LabelError::from)
            .and_then(|content| Self::from_json(&content))
            .map_err(|source| ModelLoadError::Labels {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a validated set; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the class at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Index of the class called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// All names in output order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
