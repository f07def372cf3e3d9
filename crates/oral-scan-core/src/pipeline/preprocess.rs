//! Image decoding and tensor preparation.

use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::InvalidImageError;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

const SIDE: usize = INPUT_SIZE as usize;

/// How 8-bit pixel intensities map to model input values.
///
/// Part of the artifact contract: it must match what the model saw in training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by 255, giving `[0, 1]`.
    #[default]
    UnitRange,
    /// Divide by 255, then subtract `mean` and divide by `std` per RGB channel.
    Standardize {
        /// Per-channel mean.
        mean: [f32; 3],
        /// Per-channel standard deviation.
        std: [f32; 3],
    },
}

impl Normalization {
    /// ImageNet channel statistics.
    pub const IMAGENET: Self = Self::Standardize {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    /// Maps an 8-bit intensity on `channel` to a model input value.
    #[must_use]
    pub fn apply(&self, channel: usize, value: u8) -> f32 {
        let unit = f32::from(value) / 255.0;
        match self {
            Self::UnitRange => unit,
            Self::Standardize { mean, std } => (unit - mean[channel]) / std[channel],
        }
    }

    /// Maps a model input value on `channel` back to the nearest 8-bit intensity.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn invert(&self, channel: usize, value: f32) -> u8 {
        let unit = match self {
            Self::UnitRange => value,
            Self::Standardize { mean, std } => value.mul_add(std[channel], mean[channel]),
        };
        (unit * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

/// A `(1, 3, 224, 224)` `f32` tensor ready for the model.
#[derive(Debug, Clone)]
pub struct NormalizedTensor {
    tensor: Tensor,
}

impl NormalizedTensor {
    /// The underlying tensor.
    #[must_use]
    pub const fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Rebuilds the 224x224 RGB image this tensor encodes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImageError::Layout` if the tensor cannot be read back.
    pub fn to_image(&self, normalization: &Normalization) -> Result<RgbImage, InvalidImageError> {
        // (1, 3, H, W) -> (H, W, 3)
        let values = self
            .tensor
            .squeeze(0)
            .and_then(|t| t.permute((1, 2, 0)))
            .and_then(|t| t.flatten_all())
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(InvalidImageError::Layout)?;

        let pixels: Vec<u8> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| normalization.invert(i % 3, v))
            .collect();

        RgbImage::from_raw(INPUT_SIZE, INPUT_SIZE, pixels).ok_or_else(|| {
            InvalidImageError::Layout(candle_core::Error::Msg(
                "tensor does not hold a 224x224 RGB image".to_string(),
            ))
        })
    }
}

/// Decodes encoded image bytes in any supported raster format.
///
/// # Errors
///
/// Returns `Empty` for zero-length input, `Decode` if the format is not
/// recognized or the data is corrupt, and `ZeroSized` for an image with no pixels.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, InvalidImageError> {
    if bytes.is_empty() {
        return Err(InvalidImageError::Empty);
    }

    let image = image::load_from_memory(bytes)?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(InvalidImageError::ZeroSized);
    }

    Ok(image)
}

/// Resizes to 224x224 with bicubic interpolation, drops alpha and normalizes.
///
/// The aspect ratio is not preserved. An image that is already 224x224 is not
/// resampled, so preprocessing a tensor's own [`NormalizedTensor::to_image`]
/// reproduces the tensor.
///
/// # Errors
///
/// Returns `ZeroSized` for an empty image and `Layout` if the tensor cannot be built.
pub fn preprocess_image(
    image: &DynamicImage,
    normalization: &Normalization,
    device: &Device,
) -> Result<NormalizedTensor, InvalidImageError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(InvalidImageError::ZeroSized);
    }

    let rgb = if (width, height) == (INPUT_SIZE, INPUT_SIZE) {
        image.to_rgb8()
    } else {
        image
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
            .to_rgb8()
    };

    let data: Vec<f32> = rgb
        .pixels()
        .flat_map(|p| {
            [
                normalization.apply(0, p[0]),
                normalization.apply(1, p[1]),
                normalization.apply(2, p[2]),
            ]
        })
        .collect();

    // HWC -> NCHW
    let tensor = Tensor::from_vec(data, (1, SIDE, SIDE, 3), device)
        .and_then(|t| t.permute((0, 3, 1, 2)))
        .and_then(|t| t.contiguous())
        .and_then(|t| t.to_dtype(DType::F32))
        .map_err(InvalidImageError::Layout)?;

    Ok(NormalizedTensor { tensor })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).expect("encode");
        buf.into_inner()
    }

    #[test]
    fn test_empty_bytes() {
        assert!(matches!(decode_image(&[]), Err(InvalidImageError::Empty)));
    }

    #[test]
    fn test_text_bytes() {
        let err = decode_image(b"this is not an image").unwrap_err();
        assert!(matches!(err, InvalidImageError::Decode(_)));
    }

    #[test]
    fn test_truncated_png() {
        let img = DynamicImage::new_rgb8(16, 16);
        let bytes = encode(&img, ImageFormat::Png);
        assert!(decode_image(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_shape_and_range() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            300,
            120,
            Rgba([255, 0, 128, 10]),
        ));
        let tensor = preprocess_image(&img, &Normalization::UnitRange, &Device::Cpu).unwrap();
        assert_eq!(tensor.tensor().dims(), &[1, 3, 224, 224]);

        let values = tensor.tensor().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));

        // Channel-major layout: first plane is red
        assert_eq!(values[0], 1.0);
        assert_eq!(values[224 * 224], 0.0);
    }

    #[test]
    fn test_grayscale_becomes_three_channels() {
        let img = DynamicImage::new_luma8(50, 50);
        let tensor = preprocess_image(&img, &Normalization::UnitRange, &Device::Cpu).unwrap();
        assert_eq!(tensor.tensor().dims(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_standardize() {
        let norm = Normalization::IMAGENET;
        let v = norm.apply(0, 255);
        assert!((v - (1.0 - 0.485) / 0.229).abs() < 1e-5);
        assert_eq!(norm.invert(0, v), 255);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(224, 224, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }));

        for norm in [Normalization::UnitRange, Normalization::IMAGENET] {
            let first = preprocess_image(&img, &norm, &Device::Cpu).unwrap();
            let back = DynamicImage::ImageRgb8(first.to_image(&norm).unwrap());
            let second = preprocess_image(&back, &norm, &Device::Cpu).unwrap();

            let a = first.tensor().flatten_all().unwrap().to_vec1::<f32>().unwrap();
            let b = second.tensor().flatten_all().unwrap().to_vec1::<f32>().unwrap();
            assert_eq!(a, b);
        }
    }
}
