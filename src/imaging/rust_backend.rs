//! Pure Rust engine built on `photon_rs` and the `image` crate.
//!
//! The engine maps each non-identity catalog entry to an [`Effect`] with
//! fixed parameters. Lookup goes through the catalog's raw identifiers, so
//! the set of names the engine knows is exactly the catalog minus
//! `NoFilters`; anything else is unknown.
//!
//! | Raw identifier | Effect | Center-anchored |
//! |---|---|---|
//! | `CIGaussianBlur` | photon blur, radius 10 | |
//! | `CIPhotoEffect*` | [`Look`] presets over photon | |
//! | `CIColorInvert` | photon invert | |
//! | `CISepiaTone` | photon sepia | |
//! | `CIPixellate` | photon pixelize, 8 px blocks | |
//! | `CITwirlDistortion` | radius 300, angle π | yes |
//! | `CIVignette` | intensity 0.8, radius 1 | yes |
//! | `CIUnsharpMask` | sigma 2.5 | |
//! | `CIBumpDistortion` | radius 300, scale 0.5 | yes |

use super::backend::{ImageEngine, InputKey, Transform};
use super::effects;
use super::params::{Center, Look, Sharpening};
use crate::catalog::Filter;
use image::DynamicImage;

/// Pure Rust engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustEngine;

impl RustEngine {
    pub fn new() -> Self {
        Self
    }
}

/// A concrete effect with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    GaussianBlur { radius: i32 },
    Look(Look),
    ColorInvert,
    Sepia,
    Pixellate { size: i32 },
    Twirl { radius: f32, angle: f32 },
    Vignette { intensity: f32, radius: f32 },
    UnsharpMask(Sharpening),
    Bump { radius: f32, scale: f32 },
}

impl Effect {
    /// The effect a catalog entry renders with. `None` for the identity entry,
    /// which never reaches an engine.
    pub fn for_filter(filter: Filter) -> Option<Effect> {
        let effect = match filter {
            Filter::NoFilters => return None,
            Filter::GaussianBlur => Effect::GaussianBlur { radius: 10 },
            Filter::PhotoEffectNoir => Effect::Look(Look::Noir),
            Filter::ColorInvert => Effect::ColorInvert,
            Filter::SepiaTone => Effect::Sepia,
            Filter::Pixellate => Effect::Pixellate { size: 8 },
            Filter::PhotoEffectChrome => Effect::Look(Look::Chrome),
            Filter::PhotoEffectFade => Effect::Look(Look::Fade),
            Filter::PhotoEffectInstant => Effect::Look(Look::Instant),
            Filter::PhotoEffectMono => Effect::Look(Look::Mono),
            Filter::PhotoEffectProcess => Effect::Look(Look::Process),
            Filter::PhotoEffectTonal => Effect::Look(Look::Tonal),
            Filter::PhotoEffectTransfer => Effect::Look(Look::Transfer),
            Filter::TwirlDistortion => Effect::Twirl {
                radius: 300.0,
                angle: std::f32::consts::PI,
            },
            Filter::Vignette => Effect::Vignette {
                intensity: 0.8,
                radius: 1.0,
            },
            Filter::UnsharpMask => Effect::UnsharpMask(Sharpening::strong()),
            Filter::BumpDistortion => Effect::Bump {
                radius: 300.0,
                scale: 0.5,
            },
        };
        Some(effect)
    }

    pub fn is_centered(&self) -> bool {
        matches!(
            self,
            Effect::Twirl { .. } | Effect::Vignette { .. } | Effect::Bump { .. }
        )
    }
}

/// An [`Effect`] bound to its inputs.
#[derive(Debug, Clone)]
pub struct EffectTransform {
    effect: Effect,
    input: Option<DynamicImage>,
    center: Center,
}

impl EffectTransform {
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            input: None,
            center: Center::default(),
        }
    }
}

impl Transform for EffectTransform {
    fn input_keys(&self) -> &'static [InputKey] {
        if self.effect.is_centered() {
            &[InputKey::Image, InputKey::Center]
        } else {
            &[InputKey::Image]
        }
    }

    fn set_input_image(&mut self, image: &DynamicImage) {
        self.input = Some(image.clone());
    }

    fn set_center(&mut self, center: Center) {
        if self.effect.is_centered() {
            self.center = center;
        }
    }

    fn output_image(&self) -> Option<DynamicImage> {
        let input = self.input.as_ref()?;
        if input.width() == 0 || input.height() == 0 {
            return None;
        }
        let rgba = input.to_rgba8();
        let c = self.center;
        let out = match self.effect {
            Effect::GaussianBlur { radius } => effects::gaussian_blur(&rgba, radius)?,
            Effect::Look(look) => effects::look(&rgba, look)?,
            Effect::ColorInvert => effects::invert(&rgba)?,
            Effect::Sepia => effects::sepia(&rgba)?,
            Effect::Pixellate { size } => effects::pixellate(&rgba, size)?,
            Effect::Twirl { radius, angle } => effects::twirl(&rgba, c, radius, angle),
            Effect::Vignette { intensity, radius } => {
                effects::vignette(&rgba, c, intensity, radius)
            }
            Effect::UnsharpMask(sharpening) => effects::unsharp(&rgba, sharpening),
            Effect::Bump { radius, scale } => effects::bump(&rgba, c, radius, scale),
        };
        Some(DynamicImage::ImageRgba8(out))
    }
}

impl ImageEngine for RustEngine {
    fn transform(&self, raw_name: &str) -> Option<Box<dyn Transform>> {
        let filter = Filter::ALL
            .into_iter()
            .find(|f| f.raw_identifier() == raw_name)?;
        let effect = Effect::for_filter(filter)?;
        Some(Box::new(EffectTransform::new(effect)))
    }
}
