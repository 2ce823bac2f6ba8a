//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by a user config file placed in the source root:
//!
//! ```text
//! source/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── static/                  # Never traversed for records
//! └── blumen/
//!     ├── index.txt            # Group header
//!     └── viola-odorata/
//!         ├── index.txt        # Species header + photo sessions
//!         ├── 1.jpg
//!         └── 2.jpg
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! index_file = "index.txt"  # Index document name (matched ignoring case)
//! static_dir = "static"     # Root-level directory excluded from traversal
//!
//! [images]
//! tool = "convert"          # External converter, called as `tool SRC OPTIONS... DST`
//! full_options = ["-auto-orient", "-resize", "1600x1600>", "-quality", "85", "-strip"]
//! thumb_options = ["-auto-orient", "-thumbnail", "320x320^", "-gravity", "center",
//!                  "-extent", "320x320", "-quality", "80", "-strip"]
//! full_dir = "images"       # Output subdirectory for resized copies
//! thumbs_dir = "thumbs"     # Output subdirectory for thumbnails
//!
//! [assets]
//! ignore_images = false     # Skip image checks and conversions entirely
//! remove_unused = false     # Delete derived files no species refers to
//!
//! [lint]
//! strict_vernacular_dirs = []  # Top-level dirs with strict vernacular-name rules
//!
//! [processing]
//! max_processes = 4         # Max parallel conversions (omit for auto = CPU cores)
//!
//! [[indexes]]
//! name = "index-genus"
//! key = "genus"
//! length = 1
//! ```
//!
//! Unknown keys are rejected to catch typos early. An explicit `[[indexes]]`
//! list replaces the stock index set as a whole.

use crate::indexes::{IndexKey, IndexSort};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML encode error: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `config.toml`.
///
/// Every field has a default; the file only lists what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Name of the per-directory index document, compared ignoring ASCII case.
    pub index_file: String,
    /// Root-level directory holding static files; never scanned for records.
    pub static_dir: String,
    /// External image tool invocation and output layout.
    pub images: ImagesConfig,
    /// Asset pipeline policies.
    pub assets: AssetsConfig,
    /// Formatting lint settings.
    pub lint: LintConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Secondary indexes built for the renderer.
    pub indexes: Vec<IndexConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            index_file: "index.txt".to_string(),
            static_dir: "static".to_string(),
            images: ImagesConfig::default(),
            assets: AssetsConfig::default(),
            lint: LintConfig::default(),
            processing: ProcessingConfig::default(),
            indexes: default_indexes(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "index_file must not be empty".into(),
            ));
        }
        if self.images.tool.trim().is_empty() {
            return Err(ConfigError::Validation(
                "images.tool must not be empty".into(),
            ));
        }
        if self.images.full_dir.is_empty() || self.images.thumbs_dir.is_empty() {
            return Err(ConfigError::Validation(
                "images.full_dir and images.thumbs_dir must not be empty".into(),
            ));
        }
        if self.images.full_dir == self.images.thumbs_dir {
            return Err(ConfigError::Validation(
                "images.full_dir and images.thumbs_dir must differ".into(),
            ));
        }
        let mut names = HashSet::new();
        for index in &self.indexes {
            if index.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "indexes.name must not be empty".into(),
                ));
            }
            if !names.insert(index.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate index name: {}",
                    index.name
                )));
            }
            if index.length == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "indexes.length must be positive ({})",
                    index.name
                )));
            }
        }
        Ok(())
    }
}

/// External image tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Program invoked for every conversion.
    pub tool: String,
    /// Arguments placed between source and output for full-size copies.
    pub full_options: Vec<String>,
    /// Arguments placed between source and output for thumbnails.
    pub thumb_options: Vec<String>,
    /// Output subdirectory for full-size copies.
    pub full_dir: String,
    /// Output subdirectory for thumbnails.
    pub thumbs_dir: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            tool: "convert".to_string(),
            full_options: to_args(&["-auto-orient", "-resize", "1600x1600>", "-quality", "85", "-strip"]),
            thumb_options: to_args(&[
                "-auto-orient",
                "-thumbnail",
                "320x320^",
                "-gravity",
                "center",
                "-extent",
                "320x320",
                "-quality",
                "80",
                "-strip",
            ]),
            full_dir: "images".to_string(),
            thumbs_dir: "thumbs".to_string(),
        }
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Asset pipeline policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Treat every declared image as present and skip all conversions.
    /// Useful for quick data checks on a checkout without photos.
    pub ignore_images: bool,
    /// Delete derived files that no species refers to any more.
    pub remove_unused: bool,
}

/// Formatting lint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Top-level directories whose species get the strict vernacular-name
    /// checks (genus without species, multi-word species without hyphen).
    pub strict_vernacular_dirs: Vec<String>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel conversions.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// One secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Index name, also the renderer's output file stem.
    pub name: String,
    /// Which species field(s) produce the keys.
    pub key: IndexKey,
    /// Truncate keys to this many characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Order of species within a key bucket.
    #[serde(default)]
    pub sort: IndexSort,
    /// Only species whose `makeindex` tag equals this value. When absent,
    /// only species without any tag are indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl IndexConfig {
    pub fn new(name: &str, key: IndexKey) -> Self {
        Self {
            name: name.to_string(),
            key,
            length: None,
            sort: IndexSort::default(),
            tag: None,
        }
    }
}

/// The stock index set.
pub fn default_indexes() -> Vec<IndexConfig> {
    vec![
        IndexConfig {
            tag: Some("Animalia".to_string()),
            ..IndexConfig::new("index-order", IndexKey::Order)
        },
        IndexConfig::new("index-location", IndexKey::Location),
        IndexConfig {
            length: Some(8),
            ..IndexConfig::new("index-date", IndexKey::Date)
        },
        IndexConfig {
            length: Some(1),
            ..IndexConfig::new("index-genus", IndexKey::Genus)
        },
        IndexConfig {
            length: Some(1),
            sort: IndexSort::Vernacular,
            ..IndexConfig::new("index-vernacular-genus", IndexKey::VernacularName)
        },
        IndexConfig::new("index-family", IndexKey::Family),
        IndexConfig {
            sort: IndexSort::Vernacular,
            ..IndexConfig::new("index-vernacular-family", IndexKey::VernacularFamily)
        },
    ]
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML table: the layer `config.toml` is merged onto.
fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Merge `overlay` onto `base`. Tables merge key by key; any other overlay
/// value replaces the base value outright, so `[[indexes]]` in the user file
/// replaces the whole stock index set.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `<root>/config.toml` over the stock defaults and validate it.
/// A missing file yields the defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let mut value = stock_defaults_value()?;
    match fs::read_to_string(root.join("config.toml")) {
        Ok(text) => value = merge_toml(value, toml::from_str(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let config: SiteConfig = value.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Herbarium Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Place this file in the source root.
# Unknown keys will cause an error.

# Index document looked up in every directory (compared ignoring case).
index_file = "index.txt"

# Root-level directory with static files, skipped when reading records.
static_dir = "static"

# ---------------------------------------------------------------------------
# External image tool
# ---------------------------------------------------------------------------
[images]
# Called as: tool SOURCE OPTIONS... OUTPUT (no shell involved).
tool = "convert"
full_options = ["-auto-orient", "-resize", "1600x1600>", "-quality", "85", "-strip"]
thumb_options = ["-auto-orient", "-thumbnail", "320x320^", "-gravity", "center", "-extent", "320x320", "-quality", "80", "-strip"]

# Output subdirectories for resized copies and thumbnails.
full_dir = "images"
thumbs_dir = "thumbs"

# ---------------------------------------------------------------------------
# Asset policies
# ---------------------------------------------------------------------------
[assets]
# Skip image existence checks and all conversions.
ignore_images = false

# Delete derived images that no species refers to any more.
remove_unused = false

# ---------------------------------------------------------------------------
# Lint
# ---------------------------------------------------------------------------
[lint]
# Top-level directories whose species follow the strict vernacular naming
# rules, e.g. ["blumen"].
strict_vernacular_dirs = []

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversions.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Indexes
# ---------------------------------------------------------------------------
# key:    genus | family | order | vernacular_family | vernacular_name
#         | location | date
# length: truncate keys to this many characters (optional)
# sort:   taxonomic (genus, species) | vernacular (display name)
# tag:    only species whose `makeindex` equals this value; when omitted,
#         only species without a `makeindex` tag
[[indexes]]
name = "index-order"
key = "order"
tag = "Animalia"

[[indexes]]
name = "index-location"
key = "location"

[[indexes]]
name = "index-date"
key = "date"
length = 8

[[indexes]]
name = "index-genus"
key = "genus"
length = 1

[[indexes]]
name = "index-vernacular-genus"
key = "vernacular_name"
length = 1
sort = "vernacular"

[[indexes]]
name = "index-family"
key = "family"

[[indexes]]
name = "index-vernacular-family"
key = "vernacular_family"
sort = "vernacular"
"##
}
