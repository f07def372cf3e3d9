//! Backend-neutral classifier interface.
//!
//! The pipeline only talks to these traits. Any network that can produce
//! class logits implements [`Classifier`]; networks that can also split their
//! forward pass at a convolutional feature map expose a [`FeatureExtractor`],
//! which is what Grad-CAM needs.

use candle_core::Tensor;

/// An image classifier over a fixed label set.
pub trait Classifier: Send + Sync {
    /// Number of output classes.
    fn num_classes(&self) -> usize;

    /// Pre-softmax class scores for a `(1, 3, H, W)` input, shaped `(1, num_classes)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass fails.
    fn logits(&self, input: &Tensor) -> candle_core::Result<Tensor>;

    /// Access to intermediate activations, if the architecture has them.
    fn feature_extractor(&self) -> Option<&dyn FeatureExtractor> {
        None
    }
}

/// A classifier whose forward pass can be split at a late convolutional layer.
pub trait FeatureExtractor: Send + Sync {
    /// Name of the layer whose output [`features`](Self::features) returns.
    fn layer_name(&self) -> &str;

    /// Activations of the feature layer, shaped `(1, C, h, w)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass fails.
    fn features(&self, input: &Tensor) -> candle_core::Result<Tensor>;

    /// Pre-softmax class scores computed from feature-layer activations.
    ///
    /// `logits(x)` must equal `classify_features(features(x))`.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass fails.
    fn classify_features(&self, features: &Tensor) -> candle_core::Result<Tensor>;
}
