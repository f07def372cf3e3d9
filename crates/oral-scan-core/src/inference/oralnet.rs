//! `OralNet` screening classifier.
//!
//! A plain convolutional network: a stack of 3x3 convolution stages (ReLU, 2x2
//! max pooling between stages), global average pooling, and a two-layer dense
//! head. Batch normalization from training is folded into the convolution and
//! dense biases before export, so the artifact holds only weights and biases.
//!
//! The stage count and widths are read from the artifact's tensor shapes:
//!
//! | tensor                 | shape                   |
//! |------------------------|-------------------------|
//! | `backbone.{i}.weight`  | `(out_i, in_i, 3, 3)`   |
//! | `backbone.{i}.bias`    | `(out_i)`               |
//! | `head.fc1.weight`      | `(hidden, out_last)`    |
//! | `head.fc1.bias`        | `(hidden)`              |
//! | `head.fc2.weight`      | `(classes, hidden)`     |
//! | `head.fc2.bias`        | `(classes)`             |

use candle_core::{Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use tracing::debug;

use super::classifier::{Classifier, FeatureExtractor};
use super::loader::ModelWeights;
use crate::error::ModelLoadError;
use crate::pipeline::INPUT_SIZE;

/// Kernel size of every backbone convolution.
const KERNEL: usize = 3;

/// Input channels (RGB).
const INPUT_CHANNELS: usize = 3;

/// Layer widths of an `OralNet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Architecture {
    /// Output channels of each backbone stage, in order.
    pub stages: Vec<usize>,
    /// Width of the hidden dense layer.
    pub hidden: usize,
    /// Number of output classes.
    pub num_classes: usize,
}

impl Architecture {
    /// Deepest supported backbone. Five poolings leave a 7x7 feature map at 224.
    pub const MAX_STAGES: usize = 6;

    /// Infers the architecture from tensor shapes.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError::Incompatible` if the tensors do not chain into
    /// a network accepting `(1, 3, 224, 224)` input.
    pub fn from_weights(weights: &ModelWeights) -> Result<Self, ModelLoadError> {
        let mut stages = Vec::new();
        let mut in_channels = INPUT_CHANNELS;

        while let Some(shape) = weights.shape(&format!("backbone.{}.weight", stages.len())) {
            let index = stages.len();
            match *shape {
                [out, inp, kh, kw] if inp == in_channels && kh == KERNEL && kw == KERNEL => {
                    stages.push(out);
                    in_channels = out;
                }
                _ => {
                    return Err(ModelLoadError::Incompatible(format!(
                        "backbone.{index}.weight has shape {shape:?}, expected ({{out}}, {in_channels}, {KERNEL}, {KERNEL})"
                    )));
                }
            }
        }

        if stages.is_empty() {
            return Err(ModelLoadError::Incompatible(
                "no convolutional stages (backbone.0.weight missing)".to_string(),
            ));
        }
        if stages.len() > Self::MAX_STAGES {
            return Err(ModelLoadError::Incompatible(format!(
                "{} backbone stages, at most {} fit a {INPUT_SIZE}x{INPUT_SIZE} input",
                stages.len(),
                Self::MAX_STAGES
            )));
        }

        let hidden = match weights.shape("head.fc1.weight") {
            Some(&[hidden, inp]) if inp == in_channels => hidden,
            other => {
                return Err(ModelLoadError::Incompatible(format!(
                    "head.fc1.weight has shape {other:?}, expected ({{hidden}}, {in_channels})"
                )));
            }
        };

        let num_classes = match weights.shape("head.fc2.weight") {
            Some(&[classes, inp]) if inp == hidden && classes > 0 => classes,
            other => {
                return Err(ModelLoadError::Incompatible(format!(
                    "head.fc2.weight has shape {other:?}, expected ({{classes}}, {hidden})"
                )));
            }
        };

        Ok(Self {
            stages,
            hidden,
            num_classes,
        })
    }

    /// Names and shapes of every tensor this architecture needs.
    #[must_use]
    pub fn tensor_shapes(&self) -> Vec<(String, Vec<usize>)> {
        let mut shapes = Vec::with_capacity(self.stages.len() * 2 + 4);
        let mut in_channels = INPUT_CHANNELS;

        for (i, &out) in self.stages.iter().enumerate() {
            shapes.push((
                format!("backbone.{i}.weight"),
                vec![out, in_channels, KERNEL, KERNEL],
            ));
            shapes.push((format!("backbone.{i}.bias"), vec![out]));
            in_channels = out;
        }

        shapes.push(("head.fc1.weight".to_string(), vec![self.hidden, in_channels]));
        shapes.push(("head.fc1.bias".to_string(), vec![self.hidden]));
        shapes.push((
            "head.fc2.weight".to_string(),
            vec![self.num_classes, self.hidden],
        ));
        shapes.push(("head.fc2.bias".to_string(), vec![self.num_classes]));
        shapes
    }

    /// Name of the last backbone stage, the Grad-CAM target.
    #[must_use]
    pub fn feature_layer(&self) -> String {
        format!("backbone.{}", self.stages.len().saturating_sub(1))
    }
}

/// The screening classifier.
pub struct OralNet {
    stages: Vec<Conv2d>,
    fc1: Linear,
    fc2: Linear,
    architecture: Architecture,
    feature_layer: String,
}

impl OralNet {
    /// Builds the network from a `VarBuilder` and a known architecture.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder, architecture: Architecture) -> candle_core::Result<Self> {
        let mut stages = Vec::with_capacity(architecture.stages.len());
        let mut in_channels = INPUT_CHANNELS;

        for (i, &out) in architecture.stages.iter().enumerate() {
            let conv = conv2d(
                in_channels,
                out,
                KERNEL,
                Conv2dConfig {
                    padding: 1,
                    ..Conv2dConfig::default()
                },
                vb.pp(format!("backbone.{i}")),
            )?;
            stages.push(conv);
            in_channels = out;
        }

        let fc1 = linear(in_channels, architecture.hidden, vb.pp("head.fc1"))?;
        let fc2 = linear(architecture.hidden, architecture.num_classes, vb.pp("head.fc2"))?;
        let feature_layer = architecture.feature_layer();

        Ok(Self {
            stages,
            fc1,
            fc2,
            architecture,
            feature_layer,
        })
    }

    /// Loads the network from artifact weights, inferring its architecture.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError::Incompatible` if the weights do not form a
    /// valid `OralNet`.
    pub fn load(weights: &ModelWeights) -> Result<Self, ModelLoadError> {
        let architecture = Architecture::from_weights(weights)?;
        debug!(
            "OralNet: stages {:?}, hidden {}, {} classes",
            architecture.stages, architecture.hidden, architecture.num_classes
        );

        Self::new(weights.var_builder(), architecture)
            .map_err(|e| ModelLoadError::Incompatible(e.to_string()))
    }

    /// Layer widths.
    #[must_use]
    pub const fn architecture(&self) -> &Architecture {
        &self.architecture
    }
}

impl FeatureExtractor for OralNet {
    fn layer_name(&self) -> &str {
        &self.feature_layer
    }

    fn features(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let last = self.stages.len().saturating_sub(1);
        let mut x = input.clone();

        for (i, stage) in self.stages.iter().enumerate() {
            x = stage.forward(&x)?.relu()?;
            if i < last {
                x = x.max_pool2d(2)?;
            }
        }

        Ok(x)
    }

    fn classify_features(&self, features: &Tensor) -> candle_core::Result<Tensor> {
        // Global average pooling: (1, C, h, w) -> (1, C)
        let pooled = features.mean((2, 3))?;
        let hidden = self.fc1.forward(&pooled)?.relu()?;
        self.fc2.forward(&hidden)
    }
}

impl Classifier for OralNet {
    fn num_classes(&self) -> usize {
        self.architecture.num_classes
    }

    fn logits(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let features = self.features(input)?;
        self.classify_features(&features)
    }

    fn feature_extractor(&self) -> Option<&dyn FeatureExtractor> {
        Some(self)
    }
}
