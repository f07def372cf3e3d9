//! Image source port for loading images from various sources.

use crate::domain::ImageBytes;

/// An item the source found but could not read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to read {path}: {reason}")]
pub struct UnreadableImage {
    /// Source path of the item.
    pub path: String,
    /// Why reading failed.
    pub reason: String,
}

impl UnreadableImage {
    /// Creates a read failure for `path`.
    pub fn new(path: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Port for loading encoded images from a source.
pub trait ImageSource: Send + Sync {
    /// Returns an iterator over images from this source.
    ///
    /// # Errors
    ///
    /// Individual items are errors if an image cannot be read; each error
    /// carries the path of the failed item.
    fn images(&self) -> Box<dyn Iterator<Item = Result<ImageBytes, UnreadableImage>> + Send + '_>;

    /// Returns the total number of images, if known.
    fn count_hint(&self) -> Option<usize>;
}
