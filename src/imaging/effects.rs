//! Pixel implementations of the catalog effects.
//!
//! Colour work (looks, sepia, invert, blur, pixellate) runs through
//! `photon_rs`. Unsharp mask uses `image::imageops`. The twirl and bump
//! distortions and the centred vignette have no counterpart in either crate
//! and are sampled here.
//!
//! Every function takes an RGBA buffer and returns a new one of the same
//! size.

use super::calculations::{bump_source, twirl_source, vignette_factor};
use super::params::{Center, Look, Sharpening};
use image::{Rgba, RgbaImage, imageops};
use photon_rs::{PhotonImage, channels, colour_spaces, conv, filters, monochrome};

/// Run a photon operation over a copy of `img`.
fn with_photon(img: &RgbaImage, op: impl FnOnce(&mut PhotonImage)) -> Option<RgbaImage> {
    let (width, height) = img.dimensions();
    let mut photon = PhotonImage::new(img.as_raw().clone(), width, height);
    op(&mut photon);
    RgbaImage::from_raw(
        photon.get_width(),
        photon.get_height(),
        photon.get_raw_pixels(),
    )
}

pub fn look(img: &RgbaImage, look: Look) -> Option<RgbaImage> {
    with_photon(img, |p| match look {
        Look::Noir => {
            monochrome::grayscale_human_corrected(p);
            photon_rs::effects::adjust_contrast(p, 40.0);
        }
        Look::Mono => monochrome::grayscale(p),
        Look::Tonal => {
            monochrome::desaturate(p);
            photon_rs::effects::adjust_contrast(p, -20.0);
        }
        Look::Chrome => {
            colour_spaces::saturate_hsl(p, 0.2);
            photon_rs::effects::adjust_contrast(p, 15.0);
        }
        Look::Fade => {
            colour_spaces::desaturate_hsl(p, 0.3);
            colour_spaces::lighten_hsl(p, 0.1);
        }
        Look::Instant => filters::filter(p, "vintage"),
        Look::Process => filters::filter(p, "bluechrome"),
        Look::Transfer => filters::filter(p, "twenties"),
    })
}

pub fn sepia(img: &RgbaImage) -> Option<RgbaImage> {
    with_photon(img, monochrome::sepia)
}

pub fn invert(img: &RgbaImage) -> Option<RgbaImage> {
    with_photon(img, channels::invert)
}

/// Gaussian blur. The radius is capped to a third of the shorter edge;
/// images too small for a 1 px radius come back unchanged.
pub fn gaussian_blur(img: &RgbaImage, radius: i32) -> Option<RgbaImage> {
    let shorter = img.width().min(img.height()) as i32;
    let radius = radius.min((shorter - 1) / 3);
    if radius < 1 {
        return Some(img.clone());
    }
    with_photon(img, |p| conv::gaussian_blur(p, radius))
}

/// Square blocks of `size` pixels, laid out from the top-left corner.
pub fn pixellate(img: &RgbaImage, size: i32) -> Option<RgbaImage> {
    with_photon(img, |p| photon_rs::effects::pixelize(p, size))
}

pub fn unsharp(img: &RgbaImage, sharpening: Sharpening) -> RgbaImage {
    imageops::unsharpen(img, sharpening.sigma, sharpening.threshold)
}

/// Build a new image by sampling the source at the coordinate `f` maps each
/// output pixel center to.
fn remap(img: &RgbaImage, f: impl Fn(f32, f32) -> (f32, f32)) -> RgbaImage {
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let (sx, sy) = f(x as f32 + 0.5, y as f32 + 0.5);
        sample_bilinear(img, sx - 0.5, sy - 0.5)
    })
}

/// Bilinear sample with edge clamping.
fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = (img.width() - 1) as f32;
    let max_y = (img.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as u32, y0 as u32);
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        *slot = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

pub fn twirl(img: &RgbaImage, center: Center, radius: f32, angle: f32) -> RgbaImage {
    remap(img, |x, y| twirl_source(x, y, center, radius, angle))
}

pub fn bump(img: &RgbaImage, center: Center, radius: f32, scale: f32) -> RgbaImage {
    remap(img, |x, y| bump_source(x, y, center, radius, scale))
}

/// Darken towards the corners, measured from `center`. Alpha is kept.
pub fn vignette(img: &RgbaImage, center: Center, intensity: f32, radius: f32) -> RgbaImage {
    let half_w = img.width() as f32 / 2.0;
    let half_h = img.height() as f32 / 2.0;
    let max_dist = (half_w * half_w + half_h * half_h).sqrt();
    let mut out = img.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let k = vignette_factor(x as f32 + 0.5, y as f32 + 0.5, center, max_dist, intensity, radius);
        for c in 0..3 {
            px[c] = (px[c] as f32 * k).round() as u8;
        }
    }
    out
}
