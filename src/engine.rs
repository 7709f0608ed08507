//! Pipeline wiring: detection, masking, restoration, refinement, blending.

use image::RgbImage;
use log::debug;

use crate::blend;
use crate::detection;
use crate::error::Result;
use crate::mask::{self, MaskMode};
use crate::overlay::{self, OverlaySpec};
use crate::region::Region;
use crate::restore::{ClassicalStrategy, InpaintService, Orchestrator, StrategyKind};
use crate::texture;

/// Default classical inpainting radius.
const DEFAULT_INPAINT_RADIUS: u32 = 20;

/// Where the target region comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    /// Scan the top-left corner for a watermark; fall back to a fixed box on
    /// a miss.
    Auto,
    /// Use exactly this caller-supplied region.
    Manual(Region),
}

/// How the effective region was actually obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOrigin {
    /// The detector located a watermark.
    Detected,
    /// Detection missed; the deterministic fallback box was used.
    Fallback,
    /// The caller supplied the region.
    Manual,
}

/// Options controlling one restoration call.
///
/// This is the whole per-call configuration; the pipeline keeps no mutable
/// state between calls, so engines can be shared across threads and images.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Region selection mode.
    pub region: RegionSource,
    /// Classical inpainting radius (typical range 1–30).
    pub inpaint_radius: u32,
    /// Use multi-resolution classical inpainting instead of a single pass.
    pub pyramid: bool,
    /// Composite this logo onto the restored image as a final step.
    pub overlay: Option<OverlaySpec>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            region: RegionSource::Auto,
            inpaint_radius: DEFAULT_INPAINT_RADIUS,
            pyramid: false,
            overlay: None,
        }
    }
}

/// Result of one restoration call.
#[derive(Debug)]
pub struct RestoreOutcome {
    /// The restored (and optionally overlaid) image.
    pub image: RgbImage,
    /// The effective region that was synthesized, after any edge snapping.
    pub region: Region,
    /// How the region was obtained.
    pub origin: RegionOrigin,
    /// Which strategy produced the restored pixels.
    pub strategy: StrategyKind,
}

/// The restoration engine.
///
/// Holds an optional neural inpainting service; create once and reuse for
/// multiple images. All per-call settings travel in [`RestoreOptions`], and
/// every call returns new buffers, so one engine may serve concurrent
/// invocations over independent images without locking.
#[derive(Default)]
pub struct RestoreEngine {
    service: Option<Box<dyn InpaintService>>,
}

impl RestoreEngine {
    /// Create an engine with no neural service; restorations run the
    /// classical path directly.
    #[must_use]
    pub fn new() -> Self {
        Self { service: None }
    }

    /// Create an engine backed by a neural inpainting service.
    ///
    /// The classical path remains the fallback whenever the service fails.
    #[must_use]
    pub fn with_service(service: Box<dyn InpaintService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    /// Locate a watermark region without restoring anything.
    ///
    /// Returns `None` on a detection miss; [`crate::detection::fallback_region`]
    /// provides the deterministic default used by [`RestoreEngine::restore`]
    /// in that case.
    #[must_use]
    #[allow(clippy::unused_self)] // method on `self` for API consistency
    pub fn detect(&self, image: &RgbImage) -> Option<Region> {
        detection::detect(image)
    }

    /// Run the full restoration pipeline on one image.
    ///
    /// Resolves the target region, builds the dilated mask, restores the
    /// masked pixels (neural with classical fallback, or classical
    /// directly), refines texture, feathers the seam against the original,
    /// and finally composites an overlay when one is configured. The input
    /// buffer is never mutated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRegion`] for a malformed manual region
    /// and propagates classical-path failures ([`crate::Error::InvalidRadius`],
    /// [`crate::Error::DimensionMismatch`]).
    pub fn restore(&self, image: &RgbImage, opts: &RestoreOptions) -> Result<RestoreOutcome> {
        let (width, height) = image.dimensions();

        let (requested, origin, mode) = match opts.region {
            RegionSource::Auto => match detection::detect(image) {
                Some(region) => (region, RegionOrigin::Detected, MaskMode::Auto),
                None => (
                    detection::fallback_region(width, height),
                    RegionOrigin::Fallback,
                    MaskMode::Auto,
                ),
            },
            RegionSource::Manual(region) => (region, RegionOrigin::Manual, MaskMode::Manual),
        };
        debug!(
            "restoring {},{} {}x{} ({origin:?})",
            requested.x, requested.y, requested.width, requested.height
        );

        let (mask, region) = mask::build(width, height, requested, mode)?;

        let classical = ClassicalStrategy {
            radius: opts.inpaint_radius,
            pyramid: opts.pyramid,
        };
        let orchestrator = Orchestrator::new(self.service.as_deref(), classical);
        let (restored, strategy) = orchestrator.restore(image, &mask, region)?;

        let refined = texture::refine(&restored, image, &mask, region);
        let blended = blend::blend(&refined, image, region);

        let image_out = match &opts.overlay {
            Some(spec) => overlay::apply(&blended, spec),
            None => blended,
        };

        Ok(RestoreOutcome {
            image: image_out,
            region,
            origin,
            strategy,
        })
    }

    /// Composite a logo onto an image without restoring anything.
    #[must_use]
    #[allow(clippy::unused_self)] // method on `self` for API consistency
    pub fn apply_overlay(&self, image: &RgbImage, spec: &OverlaySpec) -> RgbImage {
        overlay::apply(image, spec)
    }
}
