//! High-level image operations.
//!
//! These functions combine the catalog with engine execution: they special-case
//! the identity filter, wire inputs into a transform, and map the engine's two
//! failure modes onto [`ImagingError`]. Decoding, JPEG encoding and the feed
//! placeholder image live here too.

use super::backend::{ImageEngine, ImagingError, InputKey};
use super::calculations::fit_within;
use super::params::{Center, Quality};
use crate::catalog::Filter;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Apply a catalog filter to `image`.
///
/// The identity filter returns a copy of the input without touching the
/// engine. Everything else goes through [`apply_raw`].
pub fn apply_filter(
    engine: &impl ImageEngine,
    image: &DynamicImage,
    filter: Filter,
) -> Result<DynamicImage> {
    if filter.is_identity() {
        return Ok(image.clone());
    }
    apply_raw(engine, image, filter.raw_identifier())
}

/// Apply a filter named by user input.
///
/// Catalog display names (`Noir`) are translated to raw names first; names
/// outside the catalog are handed to the engine verbatim, which reports
/// [`ImagingError::UnknownFilter`] if it does not know them either.
pub fn apply_named(
    engine: &impl ImageEngine,
    image: &DynamicImage,
    name: &str,
) -> Result<DynamicImage> {
    match Filter::from_name(name) {
        Some(filter) => apply_filter(engine, image, filter),
        None => apply_raw(engine, image, name),
    }
}

/// Construct, configure and run the engine transform named `raw_name`.
fn apply_raw(engine: &impl ImageEngine, image: &DynamicImage, raw_name: &str) -> Result<DynamicImage> {
    let mut transform = engine
        .transform(raw_name)
        .ok_or_else(|| ImagingError::UnknownFilter(raw_name.to_string()))?;

    transform.set_input_image(image);
    if transform.input_keys().contains(&InputKey::Center) {
        transform.set_center(Center::of(image.width(), image.height()));
    }

    let output = transform
        .output_image()
        .ok_or_else(|| ImagingError::NoOutput(raw_name.to_string()))?;
    engine
        .rasterize(output)
        .ok_or_else(|| ImagingError::NoOutput(raw_name.to_string()))
}

/// Shrink `image` so its longer edge is at most `max_edge` (0 = no limit).
pub fn downscale(image: &DynamicImage, max_edge: u32) -> DynamicImage {
    match fit_within((image.width(), image.height()), max_edge) {
        Some((w, h)) => image.resize_exact(w, h, FilterType::Lanczos3),
        None => image.clone(),
    }
}

/// Decode an image from raw bytes, guessing the format from its signature.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| ImagingError::Decode(e.to_string()))
}

/// Load and decode an image from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| ImagingError::Decode(format!("{}: {}", path.display(), e)))
}

/// Re-encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.value());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

const PLACEHOLDER_SIZE: u32 = 64;
const PLACEHOLDER_CELL: u32 = 8;

/// The fixed stand-in shown when a post image cannot be fetched or decoded:
/// a light gray checkerboard.
pub fn placeholder() -> DynamicImage {
    let img = RgbaImage::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
        if (x / PLACEHOLDER_CELL + y / PLACEHOLDER_CELL) % 2 == 0 {
            Rgba([204, 204, 204, 255])
        } else {
            Rgba([230, 230, 230, 255])
        }
    });
    DynamicImage::ImageRgba8(img)
}
