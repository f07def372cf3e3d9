//! Filesystem adapters: image source and overlay store.

use anyhow::{Context, Result};
use image::RgbImage;
use oral_scan_core::{ImageBytes, ImageSource, OverlayStore, UnreadableImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Supported image extensions.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];

/// Suffix appended to the source file stem for overlay files.
const OVERLAY_SUFFIX: &str = "gradcam.png";

/// Filesystem image source adapter.
///
/// Yields raw file contents; decoding happens in the pipeline so that
/// undecodable files surface as typed image errors.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all image files from the configured paths.
    ///
    /// Directory entries are sorted so output order is stable.
    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if is_supported_image(path) {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                self.collect_from_dir(path, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn images(
        &self,
    ) -> Box<dyn Iterator<Item = Result<ImageBytes, UnreadableImage>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} image files", files.len());

        Box::new(files.into_iter().map(|path| read_image(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| RASTER_EXTENSIONS.contains(&e.as_str()))
}

/// Reads an image file without decoding it.
fn read_image(path: &Path) -> Result<ImageBytes, UnreadableImage> {
    let name = path.to_string_lossy();
    let bytes = std::fs::read(path).map_err(|e| UnreadableImage::new(name.clone(), e))?;
    Ok(ImageBytes::new(name, bytes))
}

/// Writes overlays as PNG files into a directory.
///
/// `photos/mouth.jpg` becomes `<dir>/mouth.gradcam.png`.
pub struct FsOverlayStore {
    dir: PathBuf,
}

impl FsOverlayStore {
    /// Creates a store writing into `dir`, created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the overlay for `source_path` is written.
    #[must_use]
    pub fn overlay_path(&self, source_path: &str) -> PathBuf {
        let stem = Path::new(source_path)
            .file_stem()
            .map_or_else(|| "image".into(), |s| s.to_string_lossy());
        self.dir.join(format!("{stem}.{OVERLAY_SUFFIX}"))
    }
}

impl OverlayStore for FsOverlayStore {
    fn save(&self, source_path: &str, overlay: &RgbImage) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.overlay_path(source_path);
        overlay
            .save(&path)
            .with_context(|| format!("Failed to write overlay: {}", path.display()))?;

        debug!("Saved overlay {}", path.display());
        Ok(path.to_string_lossy().into_owned())
    }
}
