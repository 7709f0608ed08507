//! Heuristic watermark region detection.
//!
//! Watermarks of interest are wide, text-like artifacts placed near the
//! top-left corner, so only a fixed sub-window (40% of the width, 15% of the
//! height) is scanned. The detector emphasizes thin strokes with a
//! morphological gradient, binarizes with an Otsu threshold, fuses glyphs
//! into word-level blobs with a wide closing element, and merges the
//! surviving blobs into a single padded bounding box.
//!
//! This is a deliberate scope restriction, not a general watermark localizer:
//! a miss is a normal outcome and callers fall back to [`fallback_region`].

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;

use crate::region::Region;

/// Fraction of the image width covered by the scan window.
const SCAN_WIDTH_FRAC: f64 = 0.40;
/// Fraction of the image height covered by the scan window.
const SCAN_HEIGHT_FRAC: f64 = 0.15;
/// Half-extent of the square gradient structuring element (3x3).
const GRADIENT_HALF: u32 = 1;
/// Half-width of the glyph-fusing closing element (15 wide).
const CONNECT_HALF_W: u32 = 7;
/// Half-height of the glyph-fusing closing element (3 tall).
const CONNECT_HALF_H: u32 = 1;
/// Blobs narrower than this are noise.
const MIN_BLOB_WIDTH: u32 = 30;
/// Blobs shorter than this are noise.
const MIN_BLOB_HEIGHT: u32 = 10;
/// Only wide, text-like blobs are accepted.
const MIN_ASPECT: f32 = 2.0;
/// Horizontal padding applied to the merged bounding box.
const PAD_X: u32 = 10;
/// Vertical padding applied to the merged bounding box.
const PAD_Y: u32 = 5;
/// A merged box wider than this fraction of the scan window is a false positive.
const MAX_WIDTH_FRAC: f64 = 0.9;
/// A merged box taller than this fraction of the scan window is a false positive.
const MAX_HEIGHT_FRAC: f64 = 0.8;
/// Fallback region width as a fraction of the image width.
const FALLBACK_WIDTH_FRAC: f64 = 0.28;
/// Fallback region height as a fraction of the image height.
const FALLBACK_HEIGHT_FRAC: f64 = 0.065;

/// Locate a wide, text-like watermark in the image's top-left scan window.
///
/// Returns `None` when no candidate survives filtering, or when the merged
/// candidate covers so much of the scan window that it is more likely a busy
/// background than a watermark. `None` is a normal outcome; use
/// [`fallback_region`] for a deterministic default box.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn detect(image: &RgbImage) -> Option<Region> {
    let (img_w, img_h) = image.dimensions();
    let scan_w = (f64::from(img_w) * SCAN_WIDTH_FRAC) as u32;
    let scan_h = (f64::from(img_h) * SCAN_HEIGHT_FRAC) as u32;
    if scan_w < 2 * GRADIENT_HALF + 1 || scan_h < 2 * GRADIENT_HALF + 1 {
        return None;
    }

    let window = imageops::crop_imm(image, 0, 0, scan_w, scan_h).to_image();
    let gray = imageops::grayscale(&window);

    // Thin text strokes show up as a band of high morphological gradient.
    let gradient = morphological_gradient(&gray);
    let level = otsu_level(&gradient);
    let binary = threshold(&gradient, level, ThresholdType::Binary);

    // Fuse individual glyphs into word-level blobs before labelling.
    let closed = close_rect(&binary, CONNECT_HALF_W, CONNECT_HALF_H);
    let labels = connected_components(&closed, Connectivity::Eight, Luma([0u8]));

    let mut merged: Option<(u32, u32, u32, u32)> = None;
    for bounds in blob_bounds(&labels) {
        let (min_x, min_y, max_x, max_y) = bounds;
        let blob_w = max_x - min_x;
        let blob_h = max_y - min_y;
        if blob_w < MIN_BLOB_WIDTH || blob_h < MIN_BLOB_HEIGHT {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let aspect = blob_w as f32 / blob_h as f32;
        if aspect < MIN_ASPECT {
            continue;
        }
        merged = Some(match merged {
            None => bounds,
            Some((mx, my, mr, mb)) => {
                (mx.min(min_x), my.min(min_y), mr.max(max_x), mb.max(max_y))
            }
        });
    }

    let (min_x, min_y, max_x, max_y) = merged?;
    let final_w = (max_x - min_x) + 2 * PAD_X;
    let final_h = (max_y - min_y) + 2 * PAD_Y;

    // Guard against busy backgrounds being misread as one giant watermark.
    if f64::from(final_w) > f64::from(scan_w) * MAX_WIDTH_FRAC
        || f64::from(final_h) > f64::from(scan_h) * MAX_HEIGHT_FRAC
    {
        debug!("rejecting oversized candidate {final_w}x{final_h} in {scan_w}x{scan_h} window");
        return None;
    }

    let padded = Region::new(
        min_x.saturating_sub(PAD_X),
        min_y.saturating_sub(PAD_Y),
        final_w,
        final_h,
    );
    let region = padded.clamped(img_w, img_h).ok()?;
    debug!(
        "detected watermark candidate at {},{} size {}x{}",
        region.x, region.y, region.width, region.height
    );
    Some(region)
}

/// Deterministic default box used when detection reports a miss.
///
/// Covers the top-left corner at 28% of the image width and 6.5% of its
/// height, where the targeted watermarks are placed.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fallback_region(image_width: u32, image_height: u32) -> Region {
    let width = ((f64::from(image_width) * FALLBACK_WIDTH_FRAC) as u32).max(1);
    let height = ((f64::from(image_height) * FALLBACK_HEIGHT_FRAC) as u32).max(1);
    Region::new(0, 0, width.min(image_width), height.min(image_height))
}

/// Morphological gradient (dilation minus erosion) with a 3x3 element.
fn morphological_gradient(src: &GrayImage) -> GrayImage {
    let dilated = dilate_rect(src, GRADIENT_HALF, GRADIENT_HALF);
    let eroded = erode_rect(src, GRADIENT_HALF, GRADIENT_HALF);
    let mut out = GrayImage::new(src.width(), src.height());
    for (x, y, px) in out.enumerate_pixels_mut() {
        let hi = dilated.get_pixel(x, y)[0];
        let lo = eroded.get_pixel(x, y)[0];
        *px = Luma([hi.saturating_sub(lo)]);
    }
    out
}

/// Grayscale dilation with a rectangular element of half-extents
/// `(half_w, half_h)`. The window is clipped at the image border.
fn dilate_rect(src: &GrayImage, half_w: u32, half_h: u32) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let y0 = y.saturating_sub(half_h);
        let y1 = (y + half_h).min(h - 1);
        for x in 0..w {
            let x0 = x.saturating_sub(half_w);
            let x1 = (x + half_w).min(w - 1);
            let mut acc = 0u8;
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    acc = acc.max(src.get_pixel(nx, ny)[0]);
                }
            }
            out.put_pixel(x, y, Luma([acc]));
        }
    }
    out
}

/// Grayscale erosion with a rectangular element of half-extents
/// `(half_w, half_h)`. The window is clipped at the image border.
fn erode_rect(src: &GrayImage, half_w: u32, half_h: u32) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let y0 = y.saturating_sub(half_h);
        let y1 = (y + half_h).min(h - 1);
        for x in 0..w {
            let x0 = x.saturating_sub(half_w);
            let x1 = (x + half_w).min(w - 1);
            let mut acc = u8::MAX;
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    acc = acc.min(src.get_pixel(nx, ny)[0]);
                }
            }
            out.put_pixel(x, y, Luma([acc]));
        }
    }
    out
}

/// Morphological closing (dilate then erode) with a rectangular element.
fn close_rect(src: &GrayImage, half_w: u32, half_h: u32) -> GrayImage {
    erode_rect(&dilate_rect(src, half_w, half_h), half_w, half_h)
}

/// Exclusive bounding boxes `(min_x, min_y, max_x, max_y)` of every non-zero
/// connected component label.
fn blob_bounds(labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<(u32, u32, u32, u32)> {
    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0);
    let mut bounds: Vec<Option<(u32, u32, u32, u32)>> = vec![None; max_label as usize + 1];

    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0] as usize;
        if label == 0 {
            continue;
        }
        bounds[label] = Some(match bounds[label] {
            None => (x, y, x + 1, y + 1),
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(x),
                min_y.min(y),
                max_x.max(x + 1),
                max_y.max(y + 1),
            ),
        });
    }

    bounds.into_iter().flatten().collect()
}
