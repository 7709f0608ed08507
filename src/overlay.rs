//! Logo overlay compositing.
//!
//! Composites a caller-supplied logo onto an image with configurable scale,
//! rotation, opacity, optional white-background keying, and either a single
//! anchored placement or a staggered tiling pattern. The logo is blended
//! onto a transparent full-size layer first, and that layer is
//! alpha-composited onto the base image exactly once.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Anchor for single (non-tiled) logo placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Top-left corner.
    #[default]
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
    /// Image center.
    Center,
}

/// One compositing request; stateless across calls.
#[derive(Debug, Clone)]
pub struct OverlaySpec {
    /// Logo image with alpha channel.
    pub logo: RgbaImage,
    /// Logo width as a fraction of the image width (typical range 0.05–0.8).
    pub scale: f32,
    /// Uniform opacity applied to the logo alpha (typical range 0.1–1.0).
    pub opacity: f32,
    /// Rotation in degrees, −180..180; positive rotates counter-clockwise.
    pub rotation_degrees: f32,
    /// Anchor used when `tiled` is false.
    pub placement: Placement,
    /// Repeat the logo across the image in a staggered grid.
    pub tiled: bool,
    /// Treat near-white logo pixels (all channels > 200) as transparent.
    pub remove_background: bool,
}

impl OverlaySpec {
    /// Create a spec with the default scale (5%), opacity (51%), no rotation,
    /// top-left placement, tiling off and background keying on.
    #[must_use]
    pub fn new(logo: RgbaImage) -> Self {
        Self {
            logo,
            scale: 0.05,
            opacity: 0.51,
            rotation_degrees: 0.0,
            placement: Placement::TopLeft,
            tiled: false,
            remove_background: true,
        }
    }
}

/// All channels above this value count as background when keying.
const WHITE_KEY_THRESHOLD: u8 = 200;
/// Anchored placements are inset from the edge by this fraction of the width.
const PLACEMENT_PADDING_FRAC: f32 = 0.02;
/// Inter-tile spacing as a fraction of the logo dimensions.
const TILE_SPACING_FRAC: f32 = 0.5;

/// Composite `spec` onto `image` and return the result.
///
/// A no-op returning a copy of `image` when the computed target dimensions
/// are not positive (empty logo, or a scale that rounds to zero pixels).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn apply(image: &RgbImage, spec: &OverlaySpec) -> RgbImage {
    let (img_w, img_h) = image.dimensions();
    if spec.logo.width() == 0 || spec.logo.height() == 0 {
        return image.clone();
    }
    let mut logo = spec.logo.clone();

    if spec.remove_background {
        for px in logo.pixels_mut() {
            if px[0] > WHITE_KEY_THRESHOLD
                && px[1] > WHITE_KEY_THRESHOLD
                && px[2] > WHITE_KEY_THRESHOLD
            {
                *px = Rgba([255, 255, 255, 0]);
            }
        }
    }

    // Rotation happens before scaling, on an expanded canvas so nothing clips.
    if spec.rotation_degrees != 0.0 {
        logo = rotate_expanded(&logo, spec.rotation_degrees);
    }

    let (lw, lh) = logo.dimensions();
    let aspect = lw as f32 / lh as f32;
    let target_w = (img_w as f32 * spec.scale) as u32;
    let target_h = (target_w as f32 / aspect) as u32;
    if target_w == 0 || target_h == 0 {
        return image.clone();
    }
    let mut logo = imageops::resize(&logo, target_w, target_h, FilterType::Lanczos3);

    let opacity = spec.opacity.clamp(0.0, 1.0);
    for px in logo.pixels_mut() {
        px[3] = (f32::from(px[3]) * opacity).round().clamp(0.0, 255.0) as u8;
    }

    let mut layer = RgbaImage::new(img_w, img_h);
    if spec.tiled {
        let step_x = i64::from(target_w) + (target_w as f32 * TILE_SPACING_FRAC) as i64;
        let step_y = i64::from(target_h) + (target_h as f32 * TILE_SPACING_FRAC) as i64;
        let mut y = 0i64;
        let mut row = 0i64;
        while y < i64::from(img_h) {
            // Stagger every other row by half a tile width.
            let offset = if row % 2 == 0 { 0 } else { i64::from(target_w) / 2 };
            let mut x = -(i64::from(target_w) / 2);
            while x < i64::from(img_w) {
                imageops::overlay(&mut layer, &logo, x + offset, y);
                x += step_x;
            }
            y += step_y;
            row += 1;
        }
    } else {
        let padding = (img_w as f32 * PLACEMENT_PADDING_FRAC) as i64;
        let right = i64::from(img_w) - i64::from(target_w) - padding;
        let bottom = i64::from(img_h) - i64::from(target_h) - padding;
        let (x, y) = match spec.placement {
            Placement::TopLeft => (padding, padding),
            Placement::TopRight => (right, padding),
            Placement::BottomLeft => (padding, bottom),
            Placement::BottomRight => (right, bottom),
            Placement::Center => (
                (i64::from(img_w) - i64::from(target_w)) / 2,
                (i64::from(img_h) - i64::from(target_h)) / 2,
            ),
        };
        imageops::overlay(&mut layer, &logo, x, y);
    }

    let mut base = DynamicImage::ImageRgb8(image.clone()).into_rgba8();
    imageops::overlay(&mut base, &layer, 0, 0);
    DynamicImage::ImageRgba8(base).into_rgb8()
}

/// Rotate the logo about its center, expanding the canvas to the rotated
/// bounding box so no corner is clipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn rotate_expanded(logo: &RgbaImage, degrees: f32) -> RgbaImage {
    let (w, h) = logo.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let bbox_w = ((w as f32 * cos + h as f32 * sin).ceil() as u32).max(1);
    let bbox_h = ((w as f32 * sin + h as f32 * cos).ceil() as u32).max(1);

    // Rotate on a square canvas covering the diagonal, then crop to the bbox.
    let diag = ((w * w + h * h) as f32).sqrt().ceil() as u32;
    let mut canvas = RgbaImage::new(diag, diag);
    imageops::overlay(
        &mut canvas,
        logo,
        i64::from((diag - w) / 2),
        i64::from((diag - h) / 2),
    );
    let rotated = rotate_about_center(&canvas, -theta, Interpolation::Bicubic, Rgba([0, 0, 0, 0]));

    let crop_w = bbox_w.min(diag);
    let crop_h = bbox_h.min(diag);
    imageops::crop_imm(&rotated, (diag - crop_w) / 2, (diag - crop_h) / 2, crop_w, crop_h)
        .to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_logo(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    fn base_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([80, 80, 80]))
    }

    #[test]
    fn zero_opacity_leaves_base_unchanged() {
        let base = base_image(100, 100);
        let spec = OverlaySpec {
            opacity: 0.0,
            remove_background: false,
            scale: 0.1,
            ..OverlaySpec::new(solid_logo(10, 10, [255, 0, 0, 255]))
        };
        let out = apply(&base, &spec);
        assert_eq!(out, base);
    }

    #[test]
    fn full_opacity_replaces_covered_pixels() {
        let base = base_image(100, 100);
        let spec = OverlaySpec {
            opacity: 1.0,
            remove_background: false,
            scale: 0.1,
            placement: Placement::TopLeft,
            ..OverlaySpec::new(solid_logo(10, 10, [255, 0, 0, 255]))
        };
        let out = apply(&base, &spec);
        // Placement padding is 2% of 100px: the logo covers (2,2)..(12,12).
        assert_eq!(*out.get_pixel(5, 5), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(50, 50), Rgb([80, 80, 80]));
    }

    #[test]
    fn zero_scale_is_noop() {
        let base = base_image(100, 100);
        let spec = OverlaySpec {
            scale: 0.0,
            ..OverlaySpec::new(solid_logo(10, 10, [255, 0, 0, 255]))
        };
        assert_eq!(apply(&base, &spec), base);
    }

    #[test]
    fn white_background_key_makes_logo_invisible() {
        let base = base_image(100, 100);
        let spec = OverlaySpec {
            opacity: 1.0,
            remove_background: true,
            scale: 0.1,
            ..OverlaySpec::new(solid_logo(10, 10, [230, 230, 230, 255]))
        };
        let out = apply(&base, &spec);
        assert_eq!(out, base);
    }

    #[test]
    fn center_placement_lands_in_the_middle() {
        let base = base_image(100, 100);
        let spec = OverlaySpec {
            opacity: 1.0,
            remove_background: false,
            scale: 0.1,
            placement: Placement::Center,
            ..OverlaySpec::new(solid_logo(10, 10, [0, 0, 255, 255]))
        };
        let out = apply(&base, &spec);
        assert_eq!(*out.get_pixel(50, 50), Rgb([0, 0, 255]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([80, 80, 80]));
    }

    #[test]
    fn bottom_right_placement_respects_padding() {
        let base = base_image(200, 100);
        let spec = OverlaySpec {
            opacity: 1.0,
            remove_background: false,
            scale: 0.05,
            placement: Placement::BottomRight,
            ..OverlaySpec::new(solid_logo(10, 10, [0, 255, 0, 255]))
        };
        let out = apply(&base, &spec);
        // Padding 4px: the logo covers (186,86)..(196,96).
        assert_eq!(*out.get_pixel(190, 90), Rgb([0, 255, 0]));
        assert_eq!(*out.get_pixel(198, 98), Rgb([80, 80, 80]));
    }

    #[test]
    fn tiling_repeats_the_logo() {
        let base = base_image(200, 100);
        let spec = OverlaySpec {
            opacity: 1.0,
            remove_background: false,
            scale: 0.05,
            tiled: true,
            ..OverlaySpec::new(solid_logo(10, 10, [255, 0, 0, 255]))
        };
        let out = apply(&base, &spec);
        let red_count = out.pixels().filter(|p| **p == Rgb([255, 0, 0])).count();
        // Tiles are 10x10 on a 15px grid: far more than three tiles land.
        assert!(red_count > 300, "only {red_count} tiled pixels");
        // Inter-tile gaps keep the base color.
        assert_eq!(*out.get_pixel(7, 2), Rgb([80, 80, 80]));
    }

    #[test]
    fn rotation_swaps_logo_extents() {
        let base = base_image(100, 100);
        let spec = OverlaySpec {
            opacity: 1.0,
            remove_background: false,
            scale: 0.1,
            rotation_degrees: 90.0,
            placement: Placement::TopLeft,
            ..OverlaySpec::new(solid_logo(20, 10, [255, 0, 0, 255]))
        };
        let out = apply(&base, &spec);
        // A 20x10 logo rotated 90 degrees becomes 10x20, scaled to 10x20.
        let px = out.get_pixel(7, 12);
        assert!(px[0] > 150 && px[1] < 100, "expected red-ish, got {px:?}");
    }

    #[test]
    fn output_dimensions_match_base() {
        let base = base_image(123, 77);
        let spec = OverlaySpec::new(solid_logo(16, 16, [10, 20, 30, 255]));
        assert_eq!(apply(&base, &spec).dimensions(), (123, 77));
    }
}
