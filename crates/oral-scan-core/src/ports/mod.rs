//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod image_source;
mod overlay_store;
mod progress;
mod result_output;

pub use image_source::{ImageSource, UnreadableImage};
pub use overlay_store::OverlayStore;
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
