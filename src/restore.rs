//! Restoration strategies and the orchestrator that selects between them.
//!
//! The neural path treats a pretrained inpainting model as an opaque service
//! behind [`InpaintService`]: given an image and a binary mask, it returns a
//! same-size image with masked pixels replaced. Everything around that black
//! box lives here: cropping a padded context window so the service never
//! processes the whole image, normalizing its output size, pasting only the
//! masked sub-area back, and falling back to the classical path when the
//! service is unavailable or fails mid-call.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use log::{debug, warn};

use crate::error::Result;
use crate::inpaint;
use crate::pyramid;
use crate::region::Region;

/// Context padding around the target region handed to the neural service.
const CONTEXT_MARGIN: u32 = 150;
/// Extra margin around the masked sub-area when pasting the result back.
const PASTE_MARGIN: u32 = 5;

/// An opaque neural inpainting service.
///
/// Implementations receive an image crop and the matching mask crop and must
/// return an image of the same size with masked pixels replaced. They may
/// fail at call time; the orchestrator recovers by switching to the
/// classical path. Calls may block for an unbounded time, so interactive
/// callers should invoke the pipeline off their UI thread.
pub trait InpaintService: Send + Sync {
    /// Replace the masked pixels of `image` with synthesized content.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Service`] when the model is unavailable or fails.
    fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage>;
}

/// A restoration strategy: fill the masked pixels of an image.
///
/// Both variants honor the same contract so the orchestrator never probes
/// which kind it holds at runtime.
pub trait RestoreStrategy {
    /// Restore `image` under `mask`; `region` is the un-dilated target box.
    ///
    /// # Errors
    ///
    /// Neural strategies return [`crate::Error::Service`] on model failure;
    /// classical strategies return [`crate::Error::InvalidRadius`] or
    /// [`crate::Error::DimensionMismatch`] for malformed input.
    fn restore(&self, image: &RgbImage, mask: &GrayImage, region: Region) -> Result<RgbImage>;
}

/// Which strategy produced a restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// The neural service filled the region.
    Neural,
    /// Single-pass classical inpainting filled the region.
    Classical,
    /// Multi-resolution classical inpainting filled the region.
    Pyramid,
}

/// Neural restoration with context cropping and paste-back.
pub struct NeuralStrategy<'s> {
    /// The backing inpainting service.
    pub service: &'s dyn InpaintService,
}

impl RestoreStrategy for NeuralStrategy<'_> {
    fn restore(&self, image: &RgbImage, mask: &GrayImage, region: Region) -> Result<RgbImage> {
        let (img_w, img_h) = image.dimensions();
        let region = region.clamped(img_w, img_h)?;

        // Bound the service call to a padded window around the region; the
        // surroundings are context for the model, not pixels to replace.
        let crop = region.expand(CONTEXT_MARGIN, CONTEXT_MARGIN, img_w, img_h);
        let crop_img = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
        let crop_mask = imageops::crop_imm(mask, crop.x, crop.y, crop.width, crop.height).to_image();
        debug!(
            "neural context crop at {},{} size {}x{}",
            crop.x, crop.y, crop.width, crop.height
        );

        let mut restored_crop = self.service.inpaint(&crop_img, &crop_mask)?;

        // Some services resize internally; normalize before pasting back.
        if restored_crop.dimensions() != crop_img.dimensions() {
            debug!(
                "service returned {}x{}, resizing to {}x{}",
                restored_crop.width(),
                restored_crop.height(),
                crop.width,
                crop.height
            );
            restored_crop =
                imageops::resize(&restored_crop, crop.width, crop.height, FilterType::CatmullRom);
        }

        // Paste only the masked sub-area (plus a small blend margin) back;
        // context pixels outside it must keep their original values.
        let rel = Region::new(region.x - crop.x, region.y - crop.y, region.width, region.height);
        let paste = rel.expand(PASTE_MARGIN, PASTE_MARGIN, crop.width, crop.height);

        let mut out = image.clone();
        for dy in 0..paste.height {
            for dx in 0..paste.width {
                let px = restored_crop.get_pixel(paste.x + dx, paste.y + dy);
                out.put_pixel(crop.x + paste.x + dx, crop.y + paste.y + dy, *px);
            }
        }
        Ok(out)
    }
}

/// Classical restoration over the full mask.
#[derive(Debug, Clone, Copy)]
pub struct ClassicalStrategy {
    /// Inpainting radius (typical range 1–30).
    pub radius: u32,
    /// Use the multi-resolution pyramid path instead of a single pass.
    pub pyramid: bool,
}

impl ClassicalStrategy {
    /// The [`StrategyKind`] this configuration reports.
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        if self.pyramid {
            StrategyKind::Pyramid
        } else {
            StrategyKind::Classical
        }
    }
}

impl RestoreStrategy for ClassicalStrategy {
    fn restore(&self, image: &RgbImage, mask: &GrayImage, _region: Region) -> Result<RgbImage> {
        if self.pyramid {
            pyramid::restore(image, mask, self.radius)
        } else {
            inpaint::inpaint(image, mask, self.radius)
        }
    }
}

/// Chooses neural restoration when a service is configured and falls back to
/// the classical strategy when it fails.
pub struct Orchestrator<'s> {
    neural: Option<&'s dyn InpaintService>,
    classical: ClassicalStrategy,
}

impl<'s> Orchestrator<'s> {
    /// Build an orchestrator from an optional service and classical settings.
    #[must_use]
    pub fn new(neural: Option<&'s dyn InpaintService>, classical: ClassicalStrategy) -> Self {
        Self { neural, classical }
    }

    /// Restore the masked pixels of `image`, reporting which strategy ran.
    ///
    /// A service failure is recovered here and never surfaces to the caller;
    /// it is logged and the classical path runs instead.
    ///
    /// # Errors
    ///
    /// Propagates classical-path failures ([`crate::Error::InvalidRadius`],
    /// [`crate::Error::DimensionMismatch`]); there is no further fallback behind
    /// them.
    pub fn restore(
        &self,
        image: &RgbImage,
        mask: &GrayImage,
        region: Region,
    ) -> Result<(RgbImage, StrategyKind)> {
        if let Some(service) = self.neural {
            let strategy = NeuralStrategy { service };
            match strategy.restore(image, mask, region) {
                Ok(restored) => return Ok((restored, StrategyKind::Neural)),
                Err(err) => {
                    warn!("neural restoration failed, falling back to classical: {err}");
                }
            }
        }
        let restored = self.classical.restore(image, mask, region)?;
        Ok((restored, self.classical.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    use crate::error::Error;

    /// Service that fills masked pixels with a fixed color.
    struct SolidFillService(Rgb<u8>);

    impl InpaintService for SolidFillService {
        fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
            let mut out = image.clone();
            for (x, y, px) in out.enumerate_pixels_mut() {
                if mask.get_pixel(x, y)[0] > 0 {
                    *px = self.0;
                }
            }
            Ok(out)
        }
    }

    /// Service that always fails at call time.
    struct FailingService;

    impl InpaintService for FailingService {
        fn inpaint(&self, _image: &RgbImage, _mask: &GrayImage) -> Result<RgbImage> {
            Err(Error::Service("model unavailable".to_string()))
        }
    }

    /// Service that silently halves the output resolution.
    struct ShrinkingService;

    impl InpaintService for ShrinkingService {
        fn inpaint(&self, image: &RgbImage, _mask: &GrayImage) -> Result<RgbImage> {
            let (w, h) = image.dimensions();
            Ok(imageops::resize(
                &RgbImage::from_pixel(w, h, Rgb([1, 2, 3])),
                (w / 2).max(1),
                (h / 2).max(1),
                FilterType::Triangle,
            ))
        }
    }

    fn block_mask(w: u32, h: u32, region: Region) -> GrayImage {
        let mut mask = GrayImage::new(w, h);
        for dy in 0..region.height {
            for dx in 0..region.width {
                mask.put_pixel(region.x + dx, region.y + dy, Luma([255]));
            }
        }
        mask
    }

    #[test]
    fn neural_path_pastes_only_masked_subarea() {
        let image = RgbImage::from_pixel(400, 400, Rgb([50, 50, 50]));
        let region = Region::new(100, 100, 60, 40);
        let mask = block_mask(400, 400, region);
        let service = SolidFillService(Rgb([255, 0, 255]));

        let orchestrator = Orchestrator::new(
            Some(&service),
            ClassicalStrategy {
                radius: 3,
                pyramid: false,
            },
        );
        let (out, kind) = orchestrator.restore(&image, &mask, region).unwrap();
        assert_eq!(kind, StrategyKind::Neural);

        // Inside the region the service's fill shows through.
        assert_eq!(*out.get_pixel(120, 120), Rgb([255, 0, 255]));
        // Context pixels outside the paste window keep their values even
        // though they were part of the service's crop.
        assert_eq!(*out.get_pixel(100 - 10, 120), Rgb([50, 50, 50]));
        assert_eq!(*out.get_pixel(120, 160 + 10), Rgb([50, 50, 50]));
    }

    #[test]
    fn service_failure_falls_back_to_classical() {
        let image = RgbImage::from_pixel(120, 120, Rgb([90, 120, 150]));
        let region = Region::new(30, 30, 20, 20);
        let mask = block_mask(120, 120, region);

        let orchestrator = Orchestrator::new(
            Some(&FailingService),
            ClassicalStrategy {
                radius: 4,
                pyramid: false,
            },
        );
        let (out, kind) = orchestrator.restore(&image, &mask, region).unwrap();
        assert_eq!(kind, StrategyKind::Classical);
        assert_eq!(out.dimensions(), (120, 120));
        // Constant surroundings diffuse to the same constant.
        assert_eq!(*out.get_pixel(35, 35), Rgb([90, 120, 150]));
    }

    #[test]
    fn mismatched_service_output_is_resized_before_pasting() {
        let image = RgbImage::from_pixel(300, 300, Rgb([50, 50, 50]));
        let region = Region::new(80, 80, 40, 40);
        let mask = block_mask(300, 300, region);

        let orchestrator = Orchestrator::new(
            Some(&ShrinkingService),
            ClassicalStrategy {
                radius: 3,
                pyramid: false,
            },
        );
        let (out, kind) = orchestrator.restore(&image, &mask, region).unwrap();
        assert_eq!(kind, StrategyKind::Neural);
        assert_eq!(out.dimensions(), (300, 300));
        // The normalized output was pasted over the region.
        assert_eq!(*out.get_pixel(100, 100), Rgb([1, 2, 3]));
    }

    #[test]
    fn no_service_runs_classical_directly() {
        let image = RgbImage::from_pixel(100, 100, Rgb([10, 10, 10]));
        let region = Region::new(20, 20, 16, 16);
        let mask = block_mask(100, 100, region);

        let orchestrator = Orchestrator::new(
            None,
            ClassicalStrategy {
                radius: 5,
                pyramid: false,
            },
        );
        let (_, kind) = orchestrator.restore(&image, &mask, region).unwrap();
        assert_eq!(kind, StrategyKind::Classical);
    }

    #[test]
    fn pyramid_flag_reports_pyramid_kind() {
        let image = RgbImage::from_pixel(100, 100, Rgb([10, 10, 10]));
        let region = Region::new(20, 20, 16, 16);
        let mask = block_mask(100, 100, region);

        let orchestrator = Orchestrator::new(
            None,
            ClassicalStrategy {
                radius: 5,
                pyramid: true,
            },
        );
        let (_, kind) = orchestrator.restore(&image, &mask, region).unwrap();
        assert_eq!(kind, StrategyKind::Pyramid);
    }

    #[test]
    fn classical_invalid_radius_is_propagated() {
        let image = RgbImage::new(50, 50);
        let mask = GrayImage::new(50, 50);
        let orchestrator = Orchestrator::new(
            None,
            ClassicalStrategy {
                radius: 0,
                pyramid: false,
            },
        );
        let result = orchestrator.restore(&image, &mask, Region::new(5, 5, 10, 10));
        assert!(matches!(result, Err(Error::InvalidRadius { radius: 0 })));
    }
}
