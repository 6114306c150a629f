//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides
//! any subset of them.
//!
//! ## Keys
//!
//! ```toml
//! # Every key is optional; the values here are the defaults
//!
//! [api]
//! feed_url = "https://filterhub.pythonanywhere.com/images/"
//! publish_url = "https://filterhub.pythonanywhere.com/images/upload_image/"
//! timeout_secs = 30         # Per-request timeout, 0 = none
//!
//! [publish]
//! jpeg_quality = 70         # Upload JPEG quality (1-100)
//!
//! [thumbnails]
//! max_edge = 256            # Longer edge of filmstrip thumbnails, 0 = full size
//!
//! [processing]
//! max_processes = 4         # Filter worker cap (omit to use every core)
//! ```
//!
//! ## Overrides
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [api]
//! feed_url = "http://localhost:8000/images/"
//! ```
//!
//! A misspelled key is an error, not a silent no-op.

use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file inside the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// Every section falls back to its `Default`, so a file may name only the
/// keys it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Remote endpoints and request timeout.
    pub api: ApiConfig,
    /// Upload encoding.
    pub publish: PublishConfig,
    /// Filmstrip thumbnail size.
    pub thumbnails: ThumbnailsConfig,
    /// Worker pool sizing.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Reject values the app cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.publish.jpeg_quality) {
            return Err(ConfigError::Validation(
                "publish.jpeg_quality must be 1-100".into(),
            ));
        }
        for (key, url) in [
            ("api.feed_url", &self.api.feed_url),
            ("api.publish_url", &self.api.publish_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Remote service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// GET endpoint returning the post list.
    pub feed_url: String,
    /// POST endpoint accepting multipart uploads.
    pub publish_url: String,
    /// Per-request timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://filterhub.pythonanywhere.com/images/".to_string(),
            publish_url: "https://filterhub.pythonanywhere.com/images/upload_image/".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Upload settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// JPEG quality for uploads (1 = worst, 100 = best).
    pub jpeg_quality: u8,
}

impl PublishConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default().value(),
        }
    }
}

/// Filmstrip thumbnail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Longer edge in pixels the source is scaled to before fan-out.
    /// 0 renders thumbnails at full size.
    pub max_edge: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self { max_edge: 256 }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound on filter workers. `None` uses every core; larger
    /// values are capped at the core count.
    pub max_processes: Option<usize>,
}

/// Number of rayon workers to start: the configured cap, never more than
/// the machine has cores.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_processes {
        Some(cap) => cap.min(cores),
        None => cores,
    }
}

// =============================================================================
// Loading
// =============================================================================

/// [`AppConfig::default`] as a TOML table, the bottom layer every user file
/// is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Lay `overlay` over `base`. Tables merge per key, recursively; any other
/// overlay value replaces what it lands on.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                let value = match merged.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, replacement) => replacement,
    }
}

/// Read `config.toml` from `dir` without interpreting it.
///
/// A missing file is `Ok(None)`; a file that is not TOML is an error.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(dir.join(CONFIG_FILENAME)) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = overlay.into_iter().fold(base, merge_toml);
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The config the app runs with: `dir/config.toml` over stock defaults,
/// validated.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(load_raw_config(dir)?)
}

/// Commented `config.toml` listing every key at its default, printed by
/// `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# FilterHub Configuration
# =======================
# Every key below is set to its default. Delete the ones you keep as-is.
# Misspelled keys are rejected.

# ---------------------------------------------------------------------------
# Remote service
# ---------------------------------------------------------------------------
[api]
# Endpoint returning the community feed as a JSON array of
# {"id": int, "image": url, "description": text} objects.
feed_url = "https://filterhub.pythonanywhere.com/images/"

# Endpoint accepting multipart uploads (description + image.jpg).
publish_url = "https://filterhub.pythonanywhere.com/images/upload_image/"

# Per-request timeout in seconds. 0 waits forever.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Publishing
# ---------------------------------------------------------------------------
[publish]
# JPEG quality for uploaded photos (1 = worst, 100 = best).
jpeg_quality = 70

# ---------------------------------------------------------------------------
# Filmstrip thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# The photo is scaled so its longer edge fits this many pixels before
# every filter is previewed. 0 previews at full size.
max_edge = 256

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel filter workers.
# Leave unset to use one worker per core.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_service() {
        let config = AppConfig::default();
        assert_eq!(
            config.api.feed_url,
            "https://filterhub.pythonanywhere.com/images/"
        );
        assert_eq!(config.publish.quality().value(), 70);
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeout_means_none() {
        let api = ApiConfig {
            timeout_secs: 0,
            ..ApiConfig::default()
        };
        assert_eq!(api.timeout(), None);
    }

    #[test]
    fn sparse_file_keeps_other_defaults() {
        let toml = r##"
[api]
feed_url = "http://localhost:8000/images/"

[thumbnails]
max_edge = 128
"##;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.feed_url, "http://localhost:8000/images/");
        assert_eq!(config.thumbnails.max_edge, 128);
        // untouched sections keep defaults
        assert_eq!(config.publish.jpeg_quality, 70);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[api]\nfeed = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_bad_quality() {
        let mut config = AppConfig::default();
        config.publish.jpeg_quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.publish.jpeg_quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let mut config = AppConfig::default();
        config.api.publish_url = "ftp://example.com/".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.publish_url"));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 100),
        };
        assert_eq!(effective_threads(&config), cores);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let one = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&one), 1);
    }

    // =========================================================================
    // merge / load
    // =========================================================================

    #[test]
    fn merge_toml_overlays_nested_keys() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n[b]\nz = 4\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
        assert_eq!(merged["b"]["z"].as_integer(), Some(4));
    }

    #[test]
    fn missing_file_means_stock_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn file_overrides_are_applied() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r##"
[publish]
jpeg_quality = 85

[processing]
max_processes = 2
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.publish.jpeg_quality, 85);
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.thumbnails.max_edge, 256);
    }

    #[test]
    fn broken_toml_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_merged_result() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[publish]\njpeg_quality = 0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
