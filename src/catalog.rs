//! The fixed filter catalog.
//!
//! Every filter the editor offers is a variant of [`Filter`]. The catalog is
//! ordered and always starts with [`Filter::NoFilters`], the identity entry
//! shown first in the filmstrip.
//!
//! ## Identifiers
//!
//! Each filter has two names:
//!
//! - **Raw identifier**: the engine-facing name, e.g. `CIPhotoEffectNoir`.
//! - **Display identifier**: the label shown under the thumbnail, derived by
//!   stripping `CI`, then `Photo`, then `Effect` from the raw name
//!   (`CIPhotoEffectNoir` → `Noir`).
//!
//! Display identifiers key the [`ThumbnailSet`](crate::session::ThumbnailSet),
//! so no two catalog entries may share one. The `display_identifiers_are_unique`
//! test guards that.

use std::fmt;

/// Substrings removed from raw identifiers, applied in this order.
const STRIPPED_SUBSTRINGS: [&str; 3] = ["CI", "Photo", "Effect"];

/// Derive the display label for a raw filter identifier.
///
/// Pure and deterministic. Every occurrence of each substring is removed, so
/// applying it to an already-stripped name returns the name unchanged.
pub fn display_identifier(raw: &str) -> String {
    STRIPPED_SUBSTRINGS
        .iter()
        .fold(raw.to_string(), |id, needle| id.replace(needle, ""))
}

/// One entry of the filter catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Filter {
    NoFilters,
    GaussianBlur,
    PhotoEffectNoir,
    ColorInvert,
    SepiaTone,
    Pixellate,
    PhotoEffectChrome,
    PhotoEffectFade,
    PhotoEffectInstant,
    PhotoEffectMono,
    PhotoEffectProcess,
    PhotoEffectTonal,
    PhotoEffectTransfer,
    TwirlDistortion,
    Vignette,
    UnsharpMask,
    BumpDistortion,
}

impl Filter {
    /// The full catalog in filmstrip order.
    pub const ALL: [Filter; 17] = [
        Filter::NoFilters,
        Filter::GaussianBlur,
        Filter::PhotoEffectNoir,
        Filter::ColorInvert,
        Filter::SepiaTone,
        Filter::Pixellate,
        Filter::PhotoEffectChrome,
        Filter::PhotoEffectFade,
        Filter::PhotoEffectInstant,
        Filter::PhotoEffectMono,
        Filter::PhotoEffectProcess,
        Filter::PhotoEffectTonal,
        Filter::PhotoEffectTransfer,
        Filter::TwirlDistortion,
        Filter::Vignette,
        Filter::UnsharpMask,
        Filter::BumpDistortion,
    ];

    /// Engine-facing name.
    pub fn raw_identifier(self) -> &'static str {
        match self {
            Filter::NoFilters => "NoFilters",
            Filter::GaussianBlur => "CIGaussianBlur",
            Filter::PhotoEffectNoir => "CIPhotoEffectNoir",
            Filter::ColorInvert => "CIColorInvert",
            Filter::SepiaTone => "CISepiaTone",
            Filter::Pixellate => "CIPixellate",
            Filter::PhotoEffectChrome => "CIPhotoEffectChrome",
            Filter::PhotoEffectFade => "CIPhotoEffectFade",
            Filter::PhotoEffectInstant => "CIPhotoEffectInstant",
            Filter::PhotoEffectMono => "CIPhotoEffectMono",
            Filter::PhotoEffectProcess => "CIPhotoEffectProcess",
            Filter::PhotoEffectTonal => "CIPhotoEffectTonal",
            Filter::PhotoEffectTransfer => "CIPhotoEffectTransfer",
            Filter::TwirlDistortion => "CITwirlDistortion",
            Filter::Vignette => "CIVignette",
            Filter::UnsharpMask => "CIUnsharpMask",
            Filter::BumpDistortion => "CIBumpDistortion",
        }
    }

    /// Label shown in the filmstrip and used as the thumbnail key.
    pub fn display_identifier(self) -> String {
        display_identifier(self.raw_identifier())
    }

    pub fn is_identity(self) -> bool {
        self == Filter::NoFilters
    }

    /// Position in the filmstrip.
    pub fn index(self) -> usize {
        Filter::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default()
    }

    /// Look up a catalog entry by raw or display identifier.
    ///
    /// Matching is exact (case-sensitive). Returns `None` for names outside
    /// the catalog.
    pub fn from_name(name: &str) -> Option<Filter> {
        Filter::ALL
            .into_iter()
            .find(|f| f.raw_identifier() == name || f.display_identifier() == name)
    }

    pub fn descriptor(self) -> FilterDescriptor {
        FilterDescriptor {
            filter: self,
            raw: self.raw_identifier(),
            display: self.display_identifier(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_identifier())
    }
}

/// A catalog entry with both of its names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub filter: Filter,
    pub raw: &'static str,
    pub display: String,
}

/// All descriptors in catalog order.
pub fn descriptors() -> Vec<FilterDescriptor> {
    Filter::ALL.into_iter().map(Filter::descriptor).collect()
}
