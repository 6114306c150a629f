//! Image-processing engine trait and shared types.
//!
//! The [`ImageEngine`] trait is the collaborator boundary for filter work.
//! An engine constructs transforms by raw identifier; a [`Transform`] takes
//! named inputs (the image, optionally a center point), exposes an output
//! image, and the engine rasterizes that output into a plain RGBA buffer.
//!
//! Two failure modes cross this boundary: the engine does not know the name
//! ([`ImagingError::UnknownFilter`]) or the transform yields nothing usable
//! ([`ImagingError::NoOutput`]).
//!
//! The production implementation is
//! [`RustEngine`](super::rust_backend::RustEngine), built on the `image` crate.

use super::params::Center;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
    #[error("Filter {0} produced no output")]
    NoOutput(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Named inputs a transform can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Image,
    Center,
}

/// A single configured image transform.
pub trait Transform: Send {
    /// Inputs this transform understands. Always contains [`InputKey::Image`].
    fn input_keys(&self) -> &'static [InputKey];

    /// Bind the primary image input.
    fn set_input_image(&mut self, image: &DynamicImage);

    /// Set the anchor point for center-based effects.
    /// Ignored by transforms whose `input_keys` lack [`InputKey::Center`].
    fn set_center(&mut self, center: Center);

    /// Run the transform. `None` when no input is bound or the effect
    /// could not produce an image.
    fn output_image(&self) -> Option<DynamicImage>;
}

/// Trait for image-processing engines.
pub trait ImageEngine: Sync {
    /// Construct the transform registered under `raw_name`, or `None` if
    /// the engine does not know it.
    fn transform(&self, raw_name: &str) -> Option<Box<dyn Transform>>;

    /// Turn a transform output into a displayable RGBA raster.
    ///
    /// Fails on an empty extent, which is what an effect with nothing to
    /// draw hands back.
    fn rasterize(&self, output: DynamicImage) -> Option<DynamicImage> {
        if output.width() == 0 || output.height() == 0 {
            return None;
        }
        Some(DynamicImage::ImageRgba8(output.into_rgba8()))
    }
}
