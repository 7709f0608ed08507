//! Error types for the watermark-restore crate.

/// Errors that can occur during region validation and restoration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied region lies outside the image or has zero area.
    #[error("invalid region {x},{y} {width}x{height} for {image_width}x{image_height} image")]
    InvalidRegion {
        /// Region left edge in pixels.
        x: u32,
        /// Region top edge in pixels.
        y: u32,
        /// Region width in pixels.
        width: u32,
        /// Region height in pixels.
        height: u32,
        /// Width of the target image.
        image_width: u32,
        /// Height of the target image.
        image_height: u32,
    },

    /// The classical inpainting radius is outside its valid range.
    #[error("inpainting radius must be at least 1, got {radius}")]
    InvalidRadius {
        /// The rejected radius value.
        radius: u32,
    },

    /// An image and its mask do not share the same dimensions.
    #[error("mask size {mask_width}x{mask_height} does not match image size {image_width}x{image_height}")]
    DimensionMismatch {
        /// Image width in pixels.
        image_width: u32,
        /// Image height in pixels.
        image_height: u32,
        /// Mask width in pixels.
        mask_width: u32,
        /// Mask height in pixels.
        mask_height: u32,
    },

    /// A neural restoration service was unavailable or failed mid-call.
    ///
    /// The orchestrator recovers from this internally by falling back to the
    /// classical path; it only reaches callers that invoke a service directly.
    #[error("restoration service failed: {0}")]
    Service(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
