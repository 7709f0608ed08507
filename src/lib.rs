//! Restore watermarked image regions.
//!
//! A watermark occludes part of an image; this crate locates its bounding
//! region (or accepts one from the caller), synthesizes plausible content for
//! it from the surrounding context, and can composite a replacement logo onto
//! the result. Restoration prefers a pluggable neural inpainting service and
//! falls back to a classical multi-pass fill when no service is configured or
//! the service fails.
//!
//! The pipeline never mutates caller buffers and keeps no state between
//! calls, so one engine may process independent images concurrently.
//!
//! # Quick Start
//!
//! ```
//! use watermark_restore::{Region, RegionSource, RestoreEngine, RestoreOptions};
//!
//! let image = image::RgbImage::from_pixel(64, 64, image::Rgb([120, 130, 140]));
//! let opts = RestoreOptions {
//!     region: RegionSource::Manual(Region::new(10, 10, 24, 12)),
//!     inpaint_radius: 3,
//!     ..RestoreOptions::default()
//! };
//!
//! let engine = RestoreEngine::new();
//! let outcome = engine.restore(&image, &opts).expect("restoration failed");
//! assert_eq!(outcome.image.dimensions(), (64, 64));
//! ```
//!
//! # Neural services
//!
//! A pretrained inpainting model plugs in through
//! [`InpaintService`]: it receives a context crop around the target region
//! and the matching mask crop, and returns the crop with masked pixels
//! replaced. Service failures are logged and recovered with the classical
//! path; they never fail a restoration.
//!
//! ```
//! use image::{GrayImage, RgbImage};
//! use watermark_restore::{InpaintService, Result, RestoreEngine};
//!
//! struct EchoService;
//!
//! impl InpaintService for EchoService {
//!     fn inpaint(&self, image: &RgbImage, _mask: &GrayImage) -> Result<RgbImage> {
//!         Ok(image.clone())
//!     }
//! }
//!
//! let engine = RestoreEngine::with_service(Box::new(EchoService));
//! ```

#![deny(missing_docs)]

pub mod blend;
pub mod detection;
mod engine;
pub mod error;
pub mod inpaint;
pub mod mask;
pub mod overlay;
pub mod pyramid;
pub mod region;
pub mod restore;
pub mod texture;

pub use engine::{RegionOrigin, RegionSource, RestoreEngine, RestoreOptions, RestoreOutcome};
pub use error::{Error, Result};
pub use mask::MaskMode;
pub use overlay::{OverlaySpec, Placement};
pub use region::Region;
pub use restore::{
    ClassicalStrategy, InpaintService, NeuralStrategy, Orchestrator, RestoreStrategy, StrategyKind,
};
