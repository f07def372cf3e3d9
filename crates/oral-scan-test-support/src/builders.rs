//! Synthetic image builders for testing.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use oral_scan_core::domain::ImageBytes;

/// Builder for creating synthetic test images.
///
/// Images are returned decoded; [`encode`](Self::encode) and friends turn them
/// into the byte payloads the pipeline consumes.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Red ramps left to right, green top to bottom, blue is constant.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let r = (u32::from(u8::MAX) * x) / width.max(1);
            let g = (u32::from(u8::MAX) * y) / height.max(1);
            Rgb([r as u8, g as u8, 90])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// A single flat color.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([r, g, b])))
    }

    /// Pink background with a bright pale lesion-like spot in the center.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn central_spot(width: u32, height: u32) -> DynamicImage {
        let cx = (width / 2) as i32;
        let cy = (height / 2) as i32;
        let radius = (width.min(height) / 6).max(1) as i32;

        let img = RgbImage::from_fn(width, height, |x, y| {
            let dx = x as i32 - cx;
            let dy = y as i32 - cy;
            if dx * dx + dy * dy < radius * radius {
                Rgb([250, 240, 220])
            } else {
                Rgb([200, 90, 100])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Encodes an image in the given format.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder rejects the image.
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        // JPEG has no alpha channel
        let image = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(image.to_rgb8())
        } else {
            image.clone()
        };
        image
            .write_to(&mut buf, format)
            .with_context(|| format!("Failed to encode synthetic image as {format:?}"))?;
        Ok(buf.into_inner())
    }

    /// PNG payload labelled with `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn png(path: &str, image: &DynamicImage) -> Result<ImageBytes> {
        Ok(ImageBytes::new(path, Self::encode(image, ImageFormat::Png)?))
    }

    /// JPEG payload labelled with `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn jpeg(path: &str, image: &DynamicImage) -> Result<ImageBytes> {
        Ok(ImageBytes::new(path, Self::encode(image, ImageFormat::Jpeg)?))
    }

    /// A payload that no decoder accepts.
    #[must_use]
    pub fn not_an_image(path: &str) -> ImageBytes {
        ImageBytes::new(path, b"this is plain text, not pixels".to_vec())
    }

    /// Writes an image to `dir/name`, picking the format from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(dir: &Path, name: &str, image: &DynamicImage) -> Result<PathBuf> {
        let path = dir.join(name);
        let format = ImageFormat::from_path(&path)
            .with_context(|| format!("No image format for {}", path.display()))?;
        let bytes = Self::encode(image, format)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_range() {
        let img = SyntheticImageBuilder::gradient(256, 10).to_rgb8();
        assert!(img.get_pixel(0, 0).0[0] < 5);
        assert!(img.get_pixel(255, 0).0[0] > 250);
        assert_eq!(img.get_pixel(100, 5).0[2], 90);
    }

    #[test]
    fn test_central_spot() {
        let img = SyntheticImageBuilder::central_spot(60, 60).to_rgb8();
        assert_eq!(img.get_pixel(30, 30).0, [250, 240, 220]);
        assert_eq!(img.get_pixel(0, 0).0, [200, 90, 100]);
    }

    #[test]
    fn test_encoded_payloads_decode() {
        let img = SyntheticImageBuilder::rgb_uniform(10, 12, 255, 0, 128);
        for payload in [
            SyntheticImageBuilder::png("a.png", &img).unwrap(),
            SyntheticImageBuilder::jpeg("a.jpg", &img).unwrap(),
        ] {
            let decoded = image::load_from_memory(&payload.bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (10, 12));
        }
    }

    #[test]
    fn test_not_an_image() {
        let payload = SyntheticImageBuilder::not_an_image("x.png");
        assert!(image::load_from_memory(&payload.bytes).is_err());
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let img = SyntheticImageBuilder::gradient(8, 8);

        let path = SyntheticImageBuilder::write_to(dir.path(), "g.png", &img).unwrap();
        assert!(path.exists());
        assert!(SyntheticImageBuilder::write_to(dir.path(), "g.unknown", &img).is_err());
    }
}
