//! Parameter types for image operations.
//!
//! These structs describe *what* an effect does, not *how*. The pixel work
//! lives in [`effects`](super::effects); the engine wires a catalog entry to
//! one of these parameter sets.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1-100, default 70). Clamped on construction.
//! - [`Center`]: anchor point for center-based effects.
//! - [`Sharpening`]: unsharp-mask parameters (sigma + threshold).
//! - [`Look`]: tone preset for the PhotoEffect entries.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Uploads are JPEG at 0.7 compression quality.
impl Default for Quality {
    fn default() -> Self {
        Self(70)
    }
}

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub x: f32,
    pub y: f32,
}

impl Center {
    /// Geometric center of a `width` x `height` image.
    pub fn of(width: u32, height: u32) -> Self {
        Self {
            x: width as f32 / 2.0,
            y: height as f32 / 2.0,
        }
    }
}

/// Where a center-based effect anchors when nobody sets a center.
impl Default for Center {
    fn default() -> Self {
        Self { x: 150.0, y: 150.0 }
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    pub fn strong() -> Self {
        Self {
            sigma: 2.5,
            threshold: 0,
        }
    }
}

/// Tone presets behind the `CIPhotoEffect*` catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Look {
    Noir,
    Chrome,
    Fade,
    Instant,
    Mono,
    Process,
    Tonal,
    Transfer,
}

impl Look {
    /// Looks that drop all colour.
    pub fn is_monochrome(self) -> bool {
        matches!(self, Look::Noir | Look::Mono | Look::Tonal)
    }
}
