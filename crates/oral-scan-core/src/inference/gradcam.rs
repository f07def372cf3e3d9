//! Gradient-weighted class activation mapping.
//!
//! The forward pass is split at the feature layer. The feature map is wrapped
//! in a `Var` so that `backward` on the target class's pre-softmax score
//! yields d(score)/d(features). The spatial mean of that gradient weights each
//! channel, and the weighted channel sum is the raw activation map.

use candle_core::{IndexOp, Tensor, Var};
use tracing::debug;

use super::classifier::FeatureExtractor;
use crate::domain::SaliencyMap;
use crate::error::ExplainabilityError;

/// Computes a Grad-CAM map for `target`, resampled to `output_size` and
/// normalized to `[0, 1]`.
///
/// # Errors
///
/// Returns `TargetOutOfRange` if `target` is not a valid class index,
/// `MissingGradient` if the backward pass does not reach the feature map,
/// `Degenerate` if the rectified map has no positive or varying evidence,
/// and `Backend` for any tensor failure.
pub fn grad_cam(
    extractor: &dyn FeatureExtractor,
    input: &Tensor,
    target: usize,
    output_size: (u32, u32),
) -> Result<SaliencyMap, ExplainabilityError> {
    let features = extractor.features(input)?;
    let (_, _, height, width) = features.dims4()?;

    let var = Var::from_tensor(&features)?;
    let logits = extractor.classify_features(var.as_tensor())?;
    let (_, classes) = logits.dims2()?;
    if target >= classes {
        return Err(ExplainabilityError::TargetOutOfRange {
            index: target,
            classes,
        });
    }

    let score = logits.i((0, target))?;
    let grads = score.backward()?;
    let grad = grads
        .get(var.as_tensor())
        .ok_or_else(|| ExplainabilityError::MissingGradient(extractor.layer_name().to_string()))?;

    // (1, C, h, w) -> (1, C, 1, 1)
    let weights = grad.mean_keepdim((2, 3))?;
    let cam = features
        .broadcast_mul(&weights)?
        .sum(1)?
        .squeeze(0)?
        .flatten_all()?
        .to_vec1::<f32>()?;

    if cam.iter().any(|v| !v.is_finite()) {
        return Err(ExplainabilityError::Degenerate);
    }

    let grid = |n: usize| {
        u32::try_from(n).map_err(|_| {
            ExplainabilityError::Backend(candle_core::Error::Msg(format!(
                "feature map dimension {n} out of range"
            )))
        })
    };
    let raw = SaliencyMap::from_raw(grid(width)?, grid(height)?, cam)
        .ok_or(ExplainabilityError::Degenerate)?;

    debug!(
        "Grad-CAM on {} for class {target}: {width}x{height} map, peak {:.4}",
        extractor.layer_name(),
        raw.max()
    );

    let (out_w, out_h) = output_size;
    raw.rectified()
        .scaled_to_peak()
        .ok_or(ExplainabilityError::Degenerate)?
        .resized(out_w, out_h)
        .normalized()
        .ok_or(ExplainabilityError::Degenerate)
}
