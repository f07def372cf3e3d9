//! Model artifact location and inspection.

use anyhow::{Context, Result};
use oral_scan_core::ModelArtifact;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file the pipeline needs from the models directory.
#[derive(Debug, Clone)]
pub struct ModelFile {
    /// What the file holds.
    pub name: &'static str,
    /// File name inside the models directory.
    pub filename: &'static str,
}

/// Files that make up an installed model.
pub const MODEL_FILES: &[ModelFile] = &[
    ModelFile {
        name: "weights",
        filename: ModelArtifact::MODEL_FILE,
    },
    ModelFile {
        name: "labels",
        filename: ModelArtifact::LABELS_FILE,
    },
];

/// Status of one model file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFileStatus {
    /// What the file holds.
    pub name: &'static str,
    /// Full path.
    pub path: PathBuf,
    /// File size, if present.
    pub size: Option<u64>,
    /// Hex SHA-256, if present and readable.
    pub sha256: Option<String>,
}

impl ModelFileStatus {
    /// Whether the file exists.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.size.is_some()
    }
}

/// The directory holding the model artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Uses `dir` as the models directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses `dir` when given, otherwise the default location.
    #[must_use]
    pub fn from_override(dir: Option<PathBuf>) -> Self {
        dir.map_or_else(Self::default_location, Self::new)
    }

    /// `XDG_DATA_HOME/oral-scan/models` or `~/.local/share/oral-scan/models`.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("oral-scan")
                .join("models"),
        )
    }

    /// The models directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths of the weights and labels inside this store.
    #[must_use]
    pub fn artifact(&self) -> ModelArtifact {
        ModelArtifact::in_dir(&self.dir)
    }

    /// Whether every model file exists.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        MODEL_FILES.iter().all(|f| self.dir.join(f.filename).is_file())
    }

    /// Presence, size and checksum of each model file.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be read.
    pub fn list(&self) -> Result<Vec<ModelFileStatus>> {
        MODEL_FILES
            .iter()
            .map(|file| {
                let path = self.dir.join(file.filename);
                let (size, sha256) = if path.is_file() {
                    let size = path
                        .metadata()
                        .with_context(|| format!("Failed to stat {}", path.display()))?
                        .len();
                    (Some(size), Some(sha256_file(&path)?))
                } else {
                    (None, None)
                };

                Ok(ModelFileStatus {
                    name: file.name,
                    path,
                    size,
                    sha256,
                })
            })
            .collect()
    }
}

/// Hex SHA-256 of a file, streamed.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let hash = format!("{:x}", hasher.finalize());
    debug!("sha256 {} = {hash}", path.display());
    Ok(hash)
}
