//! Tiny `OralNet` artifacts for tests.
//!
//! Real weights are large and not redistributable, so tests write a
//! randomly-initialized network with the same tensor layout into a temp dir.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use oral_scan_core::domain::DEFAULT_CLASS_NAMES;
use oral_scan_core::inference::Architecture;
use oral_scan_core::ModelArtifact;

/// Logit bias given to a favored class, large enough to dominate any
/// activation a tiny network produces.
const FAVOR_BIAS: f32 = 50.0;

/// How weights are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightInit {
    /// Small positive random values. Activations and gradients stay positive,
    /// so Grad-CAM yields a usable map for spatially varying input.
    Positive,
    /// All zeros. Every class scores equally and Grad-CAM is degenerate.
    Zeros,
}

/// Writes a small `OralNet` artifact and label file.
#[derive(Debug, Clone)]
pub struct TinyModelBuilder {
    architecture: Architecture,
    class_names: Vec<String>,
    init: WeightInit,
    favored: Option<usize>,
}

impl Default for TinyModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TinyModelBuilder {
    /// Two stages (4 and 8 channels), 8 hidden units, the 8 oral disease classes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            architecture: Architecture {
                stages: vec![4, 8],
                hidden: 8,
                num_classes: DEFAULT_CLASS_NAMES.len(),
            },
            class_names: DEFAULT_CLASS_NAMES.iter().map(ToString::to_string).collect(),
            init: WeightInit::Positive,
            favored: None,
        }
    }

    /// Output channels per backbone stage.
    #[must_use]
    pub fn stages(mut self, stages: Vec<usize>) -> Self {
        self.architecture.stages = stages;
        self
    }

    /// Number of model outputs, independent of the label file.
    #[must_use]
    pub const fn num_classes(mut self, classes: usize) -> Self {
        self.architecture.num_classes = classes;
        self
    }

    /// Label file contents.
    #[must_use]
    pub fn class_names(mut self, names: &[&str]) -> Self {
        self.class_names = names.iter().map(ToString::to_string).collect();
        self
    }

    /// Weight fill.
    #[must_use]
    pub const fn init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }

    /// Makes class `index` win for every input.
    #[must_use]
    pub const fn favor(mut self, index: usize) -> Self {
        self.favored = Some(index);
        self
    }

    /// Makes the class called `name` win for every input.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not one of the configured class names.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn favor_label(self, name: &str) -> Self {
        let index = self
            .class_names
            .iter()
            .position(|n| n == name)
            .expect("favored label must be a configured class name");
        self.favor(index)
    }

    /// The architecture that will be written.
    #[must_use]
    pub const fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Builds the weight tensors in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor creation fails.
    pub fn tensors(&self) -> Result<HashMap<String, Tensor>> {
        let mut tensors = HashMap::new();

        for (name, shape) in self.architecture.tensor_shapes() {
            let tensor = match self.init {
                WeightInit::Zeros => Tensor::zeros(shape.as_slice(), DType::F32, &Device::Cpu)?,
                WeightInit::Positive => {
                    let scale = positive_scale(&name, &shape);
                    Tensor::rand(0f32, scale, shape.as_slice(), &Device::Cpu)?
                }
            };
            tensors.insert(name, tensor);
        }

        if let Some(index) = self.favored {
            let mut bias = vec![0f32; self.architecture.num_classes];
            let slot = bias
                .get_mut(index)
                .with_context(|| format!("favored class {index} out of range"))?;
            *slot = FAVOR_BIAS;
            let len = bias.len();
            tensors.insert(
                "head.fc2.bias".to_string(),
                Tensor::from_vec(bias, len, &Device::Cpu)?,
            );
        }

        Ok(tensors)
    }

    /// Writes only the safetensors file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_weights(&self, path: &Path) -> Result<()> {
        candle_core::safetensors::save(&self.tensors()?, path)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Writes only the label file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_labels(&self, path: &Path) -> Result<()> {
        let json = serde_json::json!({ "class_names": self.class_names });
        std::fs::write(path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Writes both files under their standard names in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<ModelArtifact> {
        let artifact = ModelArtifact::in_dir(dir);
        self.write_weights(&artifact.model_path)?;
        self.write_labels(&artifact.labels_path)?;
        Ok(artifact)
    }
}

/// Upper bound of the uniform fill, keeping activations near unit scale.
#[allow(clippy::cast_precision_loss)]
fn positive_scale(name: &str, shape: &[usize]) -> f32 {
    if name.ends_with(".bias") {
        return 0.01;
    }
    let fan_in: usize = shape.iter().skip(1).product();
    2.0 / fan_in.max(1) as f32
}
