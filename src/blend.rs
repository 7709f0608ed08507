//! Seam blending of restored content against the original image.
//!
//! The final compositing step: a weight raster is 1.0 inside the restored
//! region and 0 in the surrounding margin, Gaussian-blurred to a smooth ramp,
//! then used to interpolate per-pixel between the restored and original
//! images. Pixels outside the expanded blend window are left exactly as the
//! restoration produced them.

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;

use crate::region::Region;

/// Minimum half-width of the blend margin in pixels.
const EDGE_MIN: u32 = 8;
/// Blend margin is `min(region side) / EDGE_DIVISOR`.
const EDGE_DIVISOR: u32 = 8;

/// Feather the seam between `restored` and `original` around `region`.
///
/// The blend window is `region` expanded by `max(8, min(w,h)/8)` on all
/// sides, clipped to the image. Inputs that disagree in shape, or a region
/// with no overlap with the image, make this a passthrough returning a copy
/// of `restored`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend(restored: &RgbImage, original: &RgbImage, region: Region) -> RgbImage {
    let (width, height) = restored.dimensions();
    if original.dimensions() != (width, height) {
        return restored.clone();
    }
    let Ok(region) = region.clamped(width, height) else {
        return restored.clone();
    };

    let edge = (region.min_side() / EDGE_DIVISOR).max(EDGE_MIN);
    let window = region.expand(edge, edge, width, height);

    let mut weight: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::new(window.width, window.height);
    let inner_x = region.x - window.x;
    let inner_y = region.y - window.y;
    for dy in 0..region.height {
        for dx in 0..region.width {
            weight.put_pixel(inner_x + dx, inner_y + dy, Luma([1.0]));
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let sigma = edge as f32 / 2.0;
    let weight = gaussian_blur_f32(&weight, sigma);

    let mut out = restored.clone();
    for dy in 0..window.height {
        for dx in 0..window.width {
            let w = weight.get_pixel(dx, dy)[0].clamp(0.0, 1.0);
            let x = window.x + dx;
            let y = window.y + dy;
            let r = restored.get_pixel(x, y);
            let o = original.get_pixel(x, y);
            let mut px = [0u8; 3];
            for ch in 0..3 {
                let v = f32::from(r[ch]) * w + f32::from(o[ch]) * (1.0 - w);
                px[ch] = v.round().clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(x, y, Rgb(px));
        }
    }
    out
}
