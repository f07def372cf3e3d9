//! Overlay store port for persisting Grad-CAM visualizations.

use image::RgbImage;

/// Port for saving heat-map overlays.
pub trait OverlayStore: Send + Sync {
    /// Saves the overlay rendered for the image at `source_path`.
    ///
    /// Returns where the overlay was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the overlay cannot be stored.
    fn save(&self, source_path: &str, overlay: &RgbImage) -> anyhow::Result<String>;
}
