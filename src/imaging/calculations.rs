//! Pure calculation functions for image dimensions and effect geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Distortion helpers map an output coordinate back to the source coordinate
//! it samples from.

use super::params::Center;

/// Calculate the size an image must be scaled to so its longer edge is at
/// most `max_edge`, keeping the aspect ratio.
///
/// Returns `None` when no resize is needed: `max_edge` is 0 (no limit) or
/// the image already fits.
///
/// ```
/// # use filterhub::imaging::fit_within;
/// assert_eq!(fit_within((1600, 1200), 400), Some((400, 300)));
/// assert_eq!(fit_within((300, 200), 400), None);
/// ```
pub fn fit_within(dims: (u32, u32), max_edge: u32) -> Option<(u32, u32)> {
    let (w, h) = dims;
    let longer = w.max(h);
    if max_edge == 0 || longer <= max_edge {
        return None;
    }
    let scale = max_edge as f64 / longer as f64;
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    Some((scaled(w), scaled(h)))
}

fn offset(x: f32, y: f32, center: Center) -> (f32, f32, f32) {
    let dx = x - center.x;
    let dy = y - center.y;
    (dx, dy, (dx * dx + dy * dy).sqrt())
}

/// Source coordinate for a twirl of `angle` radians inside `radius`.
///
/// Rotation is strongest at the center and fades to zero at the rim, so the
/// effect has no visible seam.
pub fn twirl_source(x: f32, y: f32, center: Center, radius: f32, angle: f32) -> (f32, f32) {
    let (dx, dy, r) = offset(x, y, center);
    if r >= radius {
        return (x, y);
    }
    let t = (radius - r) / radius;
    let theta = angle * t * t;
    let (sin, cos) = theta.sin_cos();
    (
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Source coordinate for a bump of strength `scale` inside `radius`.
///
/// Positive scale bulges outward (samples closer to the center), negative
/// scale pinches.
pub fn bump_source(x: f32, y: f32, center: Center, radius: f32, scale: f32) -> (f32, f32) {
    let (dx, dy, r) = offset(x, y, center);
    if r >= radius {
        return (x, y);
    }
    let t = r / radius;
    let s = 1.0 - scale * (1.0 - t * t);
    (center.x + dx * s, center.y + dy * s)
}

/// Brightness multiplier for a vignette.
///
/// `max_dist` is the distance at which the falloff reaches full `intensity`,
/// scaled by `radius`.
pub fn vignette_factor(
    x: f32,
    y: f32,
    center: Center,
    max_dist: f32,
    intensity: f32,
    radius: f32,
) -> f32 {
    let (_, _, r) = offset(x, y, center);
    let reach = (max_dist * radius).max(f32::EPSILON);
    let t = (r / reach).clamp(0.0, 1.0);
    (1.0 - intensity * t * t).clamp(0.0, 1.0)
}
