//! Saliency map produced by Grad-CAM.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

/// Spread below which a map is considered flat.
const FLAT_EPSILON: f32 = 1e-6;

/// Row-major intensity grid.
///
/// Values are in `[0, 1]` once produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl SaliencyMap {
    /// Wraps a row-major grid. Returns `None` if the length does not match.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || values.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            values,
        })
    }

    /// Grid width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Smallest value.
    #[must_use]
    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Largest value.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Zeroes negative entries.
    #[must_use]
    pub fn rectified(mut self) -> Self {
        for v in &mut self.values {
            *v = v.max(0.0);
        }
        self
    }

    /// Divides by the maximum. Returns `None` if nothing is positive.
    #[must_use]
    pub fn scaled_to_peak(mut self) -> Option<Self> {
        let peak = self.max();
        if !peak.is_finite() || peak <= FLAT_EPSILON {
            return None;
        }
        for v in &mut self.values {
            *v /= peak;
        }
        Some(self)
    }

    /// Stretches values to exactly `[0, 1]`. Returns `None` for a flat map.
    #[must_use]
    pub fn normalized(mut self) -> Option<Self> {
        let (lo, hi) = (self.min(), self.max());
        let spread = hi - lo;
        if !spread.is_finite() || spread <= FLAT_EPSILON {
            return None;
        }
        for v in &mut self.values {
            *v = (*v - lo) / spread;
        }
        Some(self)
    }

    /// Resamples to `width` x `height` with bilinear interpolation.
    ///
    /// Expects values already in `[0, 1]`; the resampler clamps to that range.
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if (width, height) == (self.width, self.height) {
            return self.clone();
        }

        let Some(grid) =
            ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(self.width, self.height, self.values.clone())
        else {
            return self.clone();
        };

        let resized = imageops::resize(&grid, width.max(1), height.max(1), FilterType::Triangle);
        Self {
            width: resized.width(),
            height: resized.height(),
            values: resized.into_raw(),
        }
    }
}
