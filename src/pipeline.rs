//! Phase orchestration.
//!
//! ```text
//! ingest → validate → link ─┬→ indexes
//!                           └→ process (asset pipeline)
//! ```
//!
//! [`load_catalog`] runs the structural phases and is all `check` needs.
//! [`build_site`] adds derived images and indexes and returns the [`Site`]
//! handed to the renderer.

use crate::config::{ConfigError, SiteConfig};
use crate::diagnostics::Diagnostics;
use crate::imaging::ImageTool;
use crate::indexes::{self, Index};
use crate::ingest::{self, IngestError};
use crate::link;
use crate::naming::SlugRegistry;
use crate::process::{self, AssetEvent, AssetReport, ProcessError};
use crate::types::Catalog;
use crate::validate;
use serde::Serialize;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the renderer consumes. Navigation links are indices into
/// `groups` and `species`.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    #[serde(flatten)]
    pub catalog: Catalog,
    pub indexes: Vec<Index>,
    pub diagnostics: Diagnostics,
    #[serde(skip)]
    pub assets: AssetReport,
}

/// Ingest, validate and link the source tree.
pub fn load_catalog(
    source: &Path,
    config: &SiteConfig,
    diags: &mut Diagnostics,
) -> Result<Catalog, IngestError> {
    let mut registry = SlugRegistry::new();
    let mut catalog = ingest::ingest(source, config, &mut registry, diags)?;
    validate::validate(&mut catalog, source, config, diags);
    link::link(&mut catalog, diags);
    Ok(catalog)
}

/// Run every phase, converting images with `tool`.
pub fn build_site(
    tool: &impl ImageTool,
    source: &Path,
    output: &Path,
    config: &SiteConfig,
    events: Option<Sender<AssetEvent>>,
) -> Result<Site, PipelineError> {
    let mut diagnostics = Diagnostics::new();
    let mut catalog = load_catalog(source, config, &mut diagnostics)?;
    let assets = process::process_with_tool(
        tool,
        &mut catalog,
        source,
        output,
        config,
        &mut diagnostics,
        events,
    )?;
    let indexes = indexes::build_all(&catalog, &config.indexes, &mut diagnostics);
    Ok(Site {
        catalog,
        indexes,
        diagnostics,
        assets,
    })
}

/// Write the site as pretty JSON to `<output>/site.json`.
pub fn write_site(site: &Site, output: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output)?;
    let json = serde_json::to_string_pretty(site)?;
    std::fs::write(output.join("site.json"), json)?;
    Ok(())
}
