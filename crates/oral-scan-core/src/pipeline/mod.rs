//! The inference pipeline: preprocess, predict, decide, explain.
//!
//! An [`InferencePipeline`] value only exists once the model artifact and label
//! set have loaded and agree with each other, so every method on it can assume
//! a ready model. Share one instance across requests with `Arc`.

mod preprocess;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use candle_core::{DType, Device, Tensor};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use preprocess::{decode_image, preprocess_image, Normalization, NormalizedTensor, INPUT_SIZE};

use crate::domain::{
    Analysis, Decision, Explanation, LabelSet, Prediction, Probabilities, SaliencyMap,
};
use crate::error::{
    ExplainabilityError, InferenceError, InvalidImageError, ModelLoadError, PipelineError,
};
use crate::inference::{grad_cam, select_device, Classifier, DevicePreference, ModelWeights, OralNet};

/// Whether forward passes share one execution slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// One forward pass at a time per pipeline.
    #[default]
    Serialized,
    /// Forward passes run in parallel without locking.
    Concurrent,
}

/// Pipeline settings fixed at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Pixel normalization the artifact was trained with.
    pub normalization: Normalization,
    /// Execution slot policy.
    pub execution: ExecutionPolicy,
    /// Grad-CAM layer to require. `None` accepts whatever layer the model exposes.
    pub feature_layer: Option<String>,
    /// Device preference.
    pub device: DevicePreference,
}

/// Locations of the model weights and label file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    /// Safetensors weights.
    pub model_path: PathBuf,
    /// Class names JSON.
    pub labels_path: PathBuf,
}

impl ModelArtifact {
    /// File name of the weights inside a models directory.
    pub const MODEL_FILE: &'static str = "oral_disease_model.safetensors";
    /// File name of the label set inside a models directory.
    pub const LABELS_FILE: &'static str = "class_names.json";

    /// Explicit paths.
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, labels_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
        }
    }

    /// The standard file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(Self::MODEL_FILE), dir.join(Self::LABELS_FILE))
    }
}

/// Per-request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Compute a saliency map.
    pub explain: bool,
    /// Class to explain. Defaults to the predicted class.
    pub target_class: Option<usize>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            explain: true,
            target_class: None,
        }
    }
}

/// A loaded model ready to serve requests.
pub struct InferencePipeline {
    model: Box<dyn Classifier>,
    labels: LabelSet,
    config: PipelineConfig,
    device: Device,
    slot: Mutex<()>,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("labels", &self.labels)
            .field("config", &self.config)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl InferencePipeline {
    /// Loads the artifact onto the preferred device.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError` if the weights or labels are missing, corrupt,
    /// or do not fit together.
    pub fn load(artifact: &ModelArtifact, config: PipelineConfig) -> Result<Self, ModelLoadError> {
        let device = select_device(config.device);
        Self::load_on(artifact, config, device)
    }

    /// Loads the artifact onto a specific device.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_on(
        artifact: &ModelArtifact,
        config: PipelineConfig,
        device: Device,
    ) -> Result<Self, ModelLoadError> {
        info!("Loading model from {}", artifact.model_path.display());

        let weights = ModelWeights::load(&artifact.model_path, &device)?;
        let model = OralNet::load(&weights)?;
        let labels = LabelSet::load(&artifact.labels_path)?;

        Self::from_parts(Box::new(model), labels, config, device)
    }

    /// Wraps an already-built classifier.
    ///
    /// Runs one forward pass on a blank input to check the output shape.
    ///
    /// # Errors
    ///
    /// Returns `LabelMismatch` if the classifier and label set disagree on the
    /// number of classes and `Incompatible` if the warm-up pass fails.
    pub fn from_parts(
        model: Box<dyn Classifier>,
        labels: LabelSet,
        config: PipelineConfig,
        device: Device,
    ) -> Result<Self, ModelLoadError> {
        if model.num_classes() != labels.len() {
            return Err(ModelLoadError::LabelMismatch {
                labels: labels.len(),
                outputs: model.num_classes(),
            });
        }

        let side = INPUT_SIZE as usize;
        let blank = Tensor::zeros((1, 3, side, side), DType::F32, &device)
            .map_err(|e| ModelLoadError::Incompatible(e.to_string()))?;
        let logits = model
            .logits(&blank)
            .map_err(|e| ModelLoadError::Incompatible(format!("warm-up forward pass: {e}")))?;
        if logits.dims() != [1, labels.len()] {
            return Err(ModelLoadError::Incompatible(format!(
                "model output shape {:?}, expected [1, {}]",
                logits.dims(),
                labels.len()
            )));
        }

        info!(
            "Model ready: {} classes, execution {:?}",
            labels.len(),
            config.execution
        );

        Ok(Self {
            model,
            labels,
            config,
            device,
            slot: Mutex::new(()),
        })
    }

    /// The label set, aligned with the probability vector.
    #[must_use]
    pub const fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Settings the pipeline was loaded with.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Device forward passes run on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Decodes and normalizes encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImageError` if the bytes are empty or undecodable.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<NormalizedTensor, InvalidImageError> {
        let image = decode_image(bytes)?;
        self.preprocess_image(&image)
    }

    /// Normalizes an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImageError` if the image has no pixels.
    pub fn preprocess_image(
        &self,
        image: &DynamicImage,
    ) -> Result<NormalizedTensor, InvalidImageError> {
        preprocess_image(image, &self.config.normalization, &self.device)
    }

    /// One forward pass, returning the softmax distribution.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError` if the pass fails, the output length does not
    /// match the label set, or the scores are not finite.
    pub fn predict(&self, input: &NormalizedTensor) -> Result<Probabilities, InferenceError> {
        let _slot = self.acquire_slot();
        self.forward(input)
    }

    /// Picks the most likely class. Ties go to the lowest index.
    ///
    /// # Errors
    ///
    /// Returns `OutputShape` if the distribution does not match the label set.
    pub fn decide(&self, probabilities: &Probabilities) -> Result<Decision, InferenceError> {
        let shape_error = || InferenceError::OutputShape {
            expected: self.labels.len(),
            actual: probabilities.len(),
        };
        if probabilities.len() != self.labels.len() {
            return Err(shape_error());
        }

        let index = probabilities.top();
        let label = self.labels.get(index).ok_or_else(shape_error)?;
        let confidence = probabilities.get(index).ok_or_else(shape_error)?;

        Ok(Decision {
            index,
            label: label.to_string(),
            confidence,
        })
    }

    /// Grad-CAM saliency for `target`, at the model's input resolution.
    ///
    /// # Errors
    ///
    /// Returns `ExplainabilityError` if the model has no usable feature layer,
    /// the target is out of range, or the map is degenerate.
    pub fn explain(
        &self,
        input: &NormalizedTensor,
        target: usize,
    ) -> Result<SaliencyMap, ExplainabilityError> {
        let _slot = self.acquire_slot();
        self.saliency(input, target)
    }

    /// Runs the full pipeline on encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` or `Inference` errors. Saliency failures do not
    /// fail the analysis; they are reported in [`Analysis::explanation`].
    pub fn analyze(&self, bytes: &[u8], options: AnalyzeOptions) -> Result<Analysis, PipelineError> {
        let image = decode_image(bytes)?;
        self.analyze_image(&image, options)
    }

    /// Runs the full pipeline on a decoded image.
    ///
    /// Under [`ExecutionPolicy::Serialized`] the whole request holds the slot.
    ///
    /// # Errors
    ///
    /// See [`analyze`](Self::analyze).
    pub fn analyze_image(
        &self,
        image: &DynamicImage,
        options: AnalyzeOptions,
    ) -> Result<Analysis, PipelineError> {
        let _slot = self.acquire_slot();
        self.run_analysis(image, options, &AtomicBool::new(false))
    }

    /// Runs [`analyze_image`](Self::analyze_image) on a worker thread and gives
    /// up after `timeout`.
    ///
    /// The deadline starts once the worker holds the execution slot, so time
    /// queued behind another request does not count against it. Queueing is
    /// bounded separately by the same `timeout`. An abandoned worker skips its
    /// remaining passes and releases the slot after the pass in flight.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::TimedOut` on expiry, plus any error the
    /// analysis itself returns.
    pub fn analyze_with_timeout(
        self: &Arc<Self>,
        image: DynamicImage,
        options: AnalyzeOptions,
        timeout: Duration,
    ) -> Result<Analysis, PipelineError> {
        let pipeline = Arc::clone(self);
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_cancelled = Arc::clone(&cancelled);
        let (started_tx, started_rx) = mpsc::sync_channel(1);
        let (tx, rx) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name("oral-scan-inference".to_string())
            .spawn(move || {
                let _slot = pipeline.acquire_slot();
                if worker_cancelled.load(Ordering::Acquire) {
                    debug!("Dropping queued analysis, caller gave up");
                    return;
                }
                // Receivers are gone if the caller already timed out
                let _ = started_tx.send(());
                let _ = tx.send(pipeline.run_analysis(&image, options, &worker_cancelled));
            })
            .map_err(InferenceError::Spawn)?;

        let abandon = |waited: &str| -> Result<Analysis, PipelineError> {
            cancelled.store(true, Ordering::Release);
            warn!("Analysis {waited} {timeout:?}, abandoning");
            Err(InferenceError::TimedOut(timeout).into())
        };

        match started_rx.recv_timeout(timeout) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => return abandon("queued for the execution slot over"),
            Err(RecvTimeoutError::Disconnected) => return Err(InferenceError::WorkerLost.into()),
        }

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => abandon("exceeded"),
            Err(RecvTimeoutError::Disconnected) => Err(InferenceError::WorkerLost.into()),
        }
    }

    /// The analysis steps, without taking the slot.
    fn run_analysis(
        &self,
        image: &DynamicImage,
        options: AnalyzeOptions,
        cancelled: &AtomicBool,
    ) -> Result<Analysis, PipelineError> {
        let tensor = self.preprocess_image(image)?;
        let probabilities = self.forward(&tensor)?;
        let decision = self.decide(&probabilities)?;

        debug!(
            "Predicted {} ({:.3}) at index {}",
            decision.label, decision.confidence, decision.index
        );

        if cancelled.load(Ordering::Acquire) {
            return Err(InferenceError::Cancelled.into());
        }

        let explanation = if options.explain {
            let target = options.target_class.unwrap_or(decision.index);
            match self.saliency(&tensor, target) {
                Ok(map) => Explanation::Map(map),
                Err(e) => {
                    warn!("Saliency map unavailable: {e}");
                    Explanation::Unavailable(e)
                }
            }
        } else {
            Explanation::Skipped
        };

        Ok(Analysis {
            prediction: Prediction::new(&decision, &probabilities, &self.labels),
            explanation,
        })
    }

    fn forward(&self, input: &NormalizedTensor) -> Result<Probabilities, InferenceError> {
        let logits = self.model.logits(input.tensor())?;
        let logits = logits
            .flatten_all()?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;

        if logits.len() != self.labels.len() {
            return Err(InferenceError::OutputShape {
                expected: self.labels.len(),
                actual: logits.len(),
            });
        }

        Probabilities::from_logits(&logits)
    }

    fn saliency(
        &self,
        input: &NormalizedTensor,
        target: usize,
    ) -> Result<SaliencyMap, ExplainabilityError> {
        let extractor = self
            .model
            .feature_extractor()
            .ok_or(ExplainabilityError::NoFeatureLayer)?;

        if let Some(requested) = &self.config.feature_layer {
            if requested != extractor.layer_name() {
                return Err(ExplainabilityError::LayerUnavailable {
                    requested: requested.clone(),
                    available: extractor.layer_name().to_string(),
                });
            }
        }

        if target >= self.labels.len() {
            return Err(ExplainabilityError::TargetOutOfRange {
                index: target,
                classes: self.labels.len(),
            });
        }

        grad_cam(extractor, input.tensor(), target, (INPUT_SIZE, INPUT_SIZE))
    }

    /// Holds the execution slot under `Serialized`; `None` under `Concurrent`.
    fn acquire_slot(&self) -> Option<MutexGuard<'_, ()>> {
        match self.config.execution {
            ExecutionPolicy::Serialized => {
                Some(self.slot.lock().unwrap_or_else(PoisonError::into_inner))
            }
            ExecutionPolicy::Concurrent => None,
        }
    }
}
