//! Heat-map rendering for saliency maps.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::domain::SaliencyMap;

/// Default heat-map opacity.
pub const DEFAULT_ALPHA: f32 = 0.4;

/// JET colormap: dark blue at 0, through cyan, yellow, to dark red at 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn jet(value: f32) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0) * 4.0;
    let channel = |center: f32| {
        let c = (1.5 - (v - center).abs()).clamp(0.0, 1.0);
        (c * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Blends a JET rendering of `map` over `image` at the image's resolution.
///
/// The map is upsampled bilinearly; `alpha` is the heat-map weight and is
/// clamped to `[0, 1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn overlay(image: &DynamicImage, map: &SaliencyMap, alpha: f32) -> RgbImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let (width, height) = image.dimensions();
    let heat = map.resized(width, height);
    let base = image.to_rgb8();

    RgbImage::from_fn(width, height, |x, y| {
        let h = jet(heat.get(x, y).unwrap_or(0.0));
        let b = base.get_pixel(x, y);
        let mix = |i: usize| {
            f32::from(h[i])
                .mul_add(alpha, f32::from(b[i]) * (1.0 - alpha))
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([mix(0), mix(1), mix(2)])
    })
}
