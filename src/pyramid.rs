//! Multi-resolution classical inpainting.
//!
//! Large or structured regions benefit from filling coarse structure first:
//! a 3-level pyramid of image and mask is inpainted coarsest-first, each
//! coarse estimate is upsampled and blended into the next finer level's
//! masked pixels, and the finest level is inpainted last to refine detail.
//! The inpainting radius shrinks with resolution (`radius / 2^level`,
//! floor 3) so coarse levels capture large-scale structure while fine levels
//! stay local.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};

use crate::error::{Error, Result};
use crate::inpaint;

/// Number of pyramid octaves (including the base resolution).
const PYRAMID_LEVELS: usize = 3;
/// Smallest effective inpainting radius at any level.
const MIN_LEVEL_RADIUS: u32 = 3;
/// Downsampled mask values above this are re-binarized to 255.
const BINARY_THRESHOLD: u8 = 127;

/// A same-shape (image, mask) pair at one pyramid octave.
///
/// The mask is strictly binary at every octave; it is re-binarized after each
/// downsample so coarse-level inpainting never sees partial-coverage pixels.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Downsampled image at this octave.
    pub image: RgbImage,
    /// Downsampled binary mask at this octave.
    pub mask: GrayImage,
}

/// Build up to `levels` octaves, halving each dimension per octave.
///
/// Stops early once a dimension would drop below 2 pixels, so the result may
/// hold fewer than `levels` entries. Level 0 is the input resolution.
#[must_use]
pub fn build_pyramid(image: &RgbImage, mask: &GrayImage, levels: usize) -> Vec<PyramidLevel> {
    let mut pyramid = vec![PyramidLevel {
        image: image.clone(),
        mask: mask.clone(),
    }];

    while pyramid.len() < levels.max(1) {
        let prev = pyramid.last().expect("pyramid is never empty");
        let (pw, ph) = prev.image.dimensions();
        if pw < 2 || ph < 2 {
            break;
        }
        let (nw, nh) = (pw / 2, ph / 2);

        let down_image = imageops::resize(&prev.image, nw, nh, FilterType::Gaussian);
        let down_mask = imageops::resize(&prev.mask, nw, nh, FilterType::Triangle);
        let binary_mask = GrayImage::from_fn(nw, nh, |x, y| {
            if down_mask.get_pixel(x, y)[0] > BINARY_THRESHOLD {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        pyramid.push(PyramidLevel {
            image: down_image,
            mask: binary_mask,
        });
    }

    pyramid
}

/// Inpaint `image` under `mask` with the multi-resolution strategy.
///
/// # Errors
///
/// Returns [`Error::InvalidRadius`] for `radius == 0` and
/// [`Error::DimensionMismatch`] when image and mask sizes differ.
pub fn restore(image: &RgbImage, mask: &GrayImage, radius: u32) -> Result<RgbImage> {
    if radius == 0 {
        return Err(Error::InvalidRadius { radius });
    }
    if mask.dimensions() != image.dimensions() {
        return Err(Error::DimensionMismatch {
            image_width: image.width(),
            image_height: image.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let mut levels = build_pyramid(image, mask, PYRAMID_LEVELS);

    // Coarsest first: inpaint, upsample, and seed the next finer level's
    // masked pixels with the coarse estimate. The finer mask is binary, so
    // the mask-weighted blend reduces to a copy and known pixels at the finer
    // level are never overwritten.
    for idx in (1..levels.len()).rev() {
        let level_radius = (radius >> idx).max(MIN_LEVEL_RADIUS);
        let (head, tail) = levels.split_at_mut(idx);
        let level = &tail[0];
        let restored = inpaint::inpaint(&level.image, &level.mask, level_radius)?;

        let finer = &mut head[idx - 1];
        let (fw, fh) = finer.image.dimensions();
        let upsampled = imageops::resize(&restored, fw, fh, FilterType::Triangle);
        for (x, y, px) in finer.image.enumerate_pixels_mut() {
            if finer.mask.get_pixel(x, y)[0] > 0 {
                *px = *upsampled.get_pixel(x, y);
            }
        }
    }

    inpaint::inpaint(&levels[0].image, &levels[0].mask, radius.max(MIN_LEVEL_RADIUS))
}
