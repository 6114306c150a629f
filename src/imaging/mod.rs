//! Filter application, pure Rust on top of the `image` crate.
//!
//! | Operation | Where |
//! |---|---|
//! | **Apply catalog filter** | [`apply_filter`] (identity short-circuits) |
//! | **Apply by name** | [`apply_named`] (unknown names fail) |
//! | **Effects** | [`RustEngine`] → `effects` pixel functions |
//! | **Encode upload** | [`encode_jpeg`] |
//! | **Feed fallback** | [`placeholder`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and distortion math (unit testable)
//! - **Effects**: photon-rs colour work plus the sampled distortions
//! - **Parameters**: Data structures describing effects and encoding
//! - **Backend**: [`ImageEngine`] / [`Transform`] traits + [`RustEngine`]
//! - **Operations**: High-level functions combining the catalog + engine

pub mod backend;
mod calculations;
mod effects;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ImageEngine, ImagingError, InputKey, Transform};
pub use calculations::fit_within;
pub use operations::{
    apply_filter, apply_named, decode_image, downscale, encode_jpeg, load_image, placeholder,
};
pub use params::{Center, Look, Quality, Sharpening};
pub use rust_backend::{Effect, RustEngine};
