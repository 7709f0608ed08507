//! Binary and feathered mask construction.
//!
//! A mask is a single-channel raster the size of the target image: 255 marks
//! pixels to be synthesized, 0 marks pixels to keep. The feathered variant
//! carries graduated values used as blend weights rather than hard booleans.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::error::Result;
use crate::region::Region;

/// How the target region was chosen.
///
/// Automatically detected regions get aggressive dilation and edge snapping;
/// manual selections are authoritative, so dilation is weaker and edges are
/// never snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Region produced by the detector (or its fallback box).
    Auto,
    /// Region supplied by the caller.
    Manual,
}

/// Regions whose left/top edge is within this distance of the image boundary
/// are snapped flush to it (auto mode only).
const EDGE_SNAP: u32 = 10;
/// Dilation radius for detected regions (9x9 square element).
const AUTO_DILATE_RADIUS: u8 = 4;
/// Dilation radius for manual selections (5x5 square element).
const MANUAL_DILATE_RADIUS: u8 = 2;
/// Dilation passes applied in both modes.
const DILATE_ITERATIONS: usize = 2;
/// Minimum feather ramp length in pixels.
const FEATHER_MIN: u32 = 5;
/// Feather ramp length is `min(region side) / FEATHER_DIVISOR`.
const FEATHER_DIVISOR: u32 = 10;

/// Build a dilated binary mask for `region` on an image of the given size.
///
/// In [`MaskMode::Auto`], a region whose left or top edge lies within 10px of
/// the image boundary is snapped flush to that boundary and grown to
/// compensate; watermarks are assumed to originate at an edge when nearly
/// touching it. Returns the mask together with the (possibly snapped)
/// effective region, which later stages must use in place of the input.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidRegion`] if `region` has zero area or lies
/// entirely outside the image.
pub fn build(
    image_width: u32,
    image_height: u32,
    region: Region,
    mode: MaskMode,
) -> Result<(GrayImage, Region)> {
    let mut region = region.clamped(image_width, image_height)?;

    if mode == MaskMode::Auto {
        if region.x < EDGE_SNAP {
            region.width += region.x;
            region.x = 0;
        }
        if region.y < EDGE_SNAP {
            region.height += region.y;
            region.y = 0;
        }
    }

    let mut mask = GrayImage::new(image_width, image_height);
    for dy in 0..region.height {
        for dx in 0..region.width {
            mask.put_pixel(region.x + dx, region.y + dy, Luma([255]));
        }
    }

    let radius = match mode {
        MaskMode::Auto => AUTO_DILATE_RADIUS,
        MaskMode::Manual => MANUAL_DILATE_RADIUS,
    };
    for _ in 0..DILATE_ITERATIONS {
        mask = dilate(&mask, Norm::LInf, radius);
    }

    Ok((mask, region))
}

/// Build a feathered mask: 255 deep inside `region`, ramping linearly to zero
/// over `max(5, min(w,h)/10)` pixels at each region edge.
///
/// Edges that coincide with the image boundary stay hard; there is nothing
/// outside them to blend with.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidRegion`] if `region` has zero area or lies
/// entirely outside the image.
pub fn feathered(image_width: u32, image_height: u32, region: Region) -> Result<GrayImage> {
    let region = region.clamped(image_width, image_height)?;
    let feather = (region.min_side() / FEATHER_DIVISOR).max(FEATHER_MIN);

    let mut mask = GrayImage::new(image_width, image_height);
    for dy in 0..region.height {
        for dx in 0..region.width {
            let mut weight = 255u32;

            if region.x > 0 && dx < feather {
                weight = weight.min(255 * (dx + 1) / feather);
            }
            if region.right() < image_width {
                let dist = region.width - 1 - dx;
                if dist < feather {
                    weight = weight.min(255 * (dist + 1) / feather);
                }
            }
            if region.y > 0 && dy < feather {
                weight = weight.min(255 * (dy + 1) / feather);
            }
            if region.bottom() < image_height {
                let dist = region.height - 1 - dy;
                if dist < feather {
                    weight = weight.min(255 * (dist + 1) / feather);
                }
            }

            #[allow(clippy::cast_possible_truncation)]
            mask.put_pixel(region.x + dx, region.y + dy, Luma([weight.min(255) as u8]));
        }
    }

    Ok(mask)
}
