//! ML inference backend using Candle.
//!
//! Provides device selection, safetensors loading, the `OralNet` classifier and
//! Grad-CAM over any model that exposes a [`FeatureExtractor`].

mod classifier;
mod device;
mod gradcam;
mod loader;
mod oralnet;

pub use classifier::{Classifier, FeatureExtractor};
pub use device::{select_device, DevicePreference};
pub use gradcam::grad_cam;
pub use loader::ModelWeights;
pub use oralnet::{Architecture, OralNet};
