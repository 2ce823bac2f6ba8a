//! Derived image generation.
//!
//! Runs over the validated catalog and keeps the output image directories in
//! sync with the photo sessions. For every resolved source image:
//!
//! - the derived name is `{species-slug}-{digits of the filename}.jpg`
//!   (see [`naming::derived_image_name`]);
//! - a full copy and a thumbnail are converted unless a fresh one exists.
//!
//! ## Output Structure
//!
//! ```text
//! docs/
//! ├── images/
//! │   ├── viola-odorata-1.jpg     # images.full_options
//! │   └── viola-odorata-2.jpg
//! └── thumbs/
//!     ├── viola-odorata-1.jpg     # images.thumb_options
//!     └── viola-odorata-2.jpg
//! ```
//!
//! ## Freshness
//!
//! An output is fresh when it exists and its modification time is not older
//! than the source's. Fresh outputs are never reconverted, so a second run
//! over an unchanged tree converts nothing. Whatever a failed conversion
//! wrote is deleted, so the output is missing and retried on the next run.
//!
//! ## Parallel Processing
//!
//! Planning is sequential: derived names, duplicate detection and the
//! session bookkeeping all happen before any converter starts. The planned
//! conversions are then independent and run on the global
//! [rayon](https://docs.rs/rayon) pool.

use crate::config::SiteConfig;
use crate::diagnostics::Diagnostics;
use crate::imaging::{ConvertParams, ImageTool, MagickTool, Variant};
use crate::naming;
use crate::types::Catalog;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot scan output directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Progress reported while converting.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    /// Conversions are about to start.
    Planned { jobs: usize, fresh: usize },
    Converted { output: PathBuf, variant: Variant },
    Failed {
        output: PathBuf,
        variant: Variant,
        message: String,
    },
    /// A derived file no species refers to.
    Unused { path: PathBuf, removed: bool },
}

/// Per-run conversion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    /// Outputs produced by the converter.
    pub converted: u32,
    /// Outputs that were already up to date.
    pub fresh: u32,
    /// Conversions that failed.
    pub failed: u32,
    /// Source images not processed (duplicate derived name or unresolved).
    pub skipped: u32,
}

impl AssetStats {
    pub fn total(&self) -> u32 {
        self.converted + self.fresh + self.failed
    }
}

impl fmt::Display for AssetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} converted, {} fresh, {} failed ({} total)",
            self.converted,
            self.fresh,
            self.failed,
            self.total()
        )?;
        if self.skipped > 0 {
            write!(f, ", {} images skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Outcome of an asset run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetReport {
    pub stats: AssetStats,
    /// Derived files not referenced by any species, sorted.
    pub unused: Vec<PathBuf>,
}

/// Convert with the configured external tool.
pub fn process(
    catalog: &mut Catalog,
    source_root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    diags: &mut Diagnostics,
    events: Option<Sender<AssetEvent>>,
) -> Result<AssetReport, ProcessError> {
    let tool = MagickTool::from_config(&config.images);
    process_with_tool(&tool, catalog, source_root, output_dir, config, diags, events)
}

/// Convert using a specific tool (allows testing with a mock).
///
/// Fills every session's derived names and every species' thumbnail name.
/// Failed conversions are diagnostics; only an unusable output directory is
/// an `Err`.
pub fn process_with_tool(
    tool: &impl ImageTool,
    catalog: &mut Catalog,
    source_root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    diags: &mut Diagnostics,
    events: Option<Sender<AssetEvent>>,
) -> Result<AssetReport, ProcessError> {
    if config.assets.ignore_images {
        tracing::info!("image processing disabled");
        return Ok(AssetReport::default());
    }

    let full_dir = output_dir.join(&config.images.full_dir);
    let thumbs_dir = output_dir.join(&config.images.thumbs_dir);
    fs::create_dir_all(&full_dir)?;
    fs::create_dir_all(&thumbs_dir)?;

    let mut stats = AssetStats::default();
    let mut used = HashSet::new();
    let jobs = plan(
        catalog,
        source_root,
        &full_dir,
        &thumbs_dir,
        &mut used,
        &mut stats,
        diags,
    );

    send(&events, AssetEvent::Planned {
        jobs: jobs.len(),
        fresh: stats.fresh as usize,
    });
    tracing::info!(jobs = jobs.len(), fresh = stats.fresh, "converting images");

    let results: Vec<Result<(), String>> = jobs
        .par_iter()
        .map(|job| {
            let result = tool.convert(job).map_err(|e| e.to_string());
            let event = match &result {
                Ok(()) => AssetEvent::Converted {
                    output: job.output.clone(),
                    variant: job.variant,
                },
                Err(message) => AssetEvent::Failed {
                    output: job.output.clone(),
                    variant: job.variant,
                    message: message.clone(),
                },
            };
            send(&events, event);
            result
        })
        .collect();

    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(()) => stats.converted += 1,
            Err(message) => {
                stats.failed += 1;
                tracing::warn!(output = %job.output.display(), "conversion failed");
                discard_output(&job.output, diags);
                diags.error(
                    job.source.display().to_string(),
                    format!("{} conversion failed: {message}", job.variant),
                );
            }
        }
    }

    let mut unused = Vec::new();
    for dir in [&full_dir, &thumbs_dir] {
        unused.extend(sweep_unused(
            dir,
            &used,
            config.assets.remove_unused,
            diags,
            &events,
        )?);
    }

    Ok(AssetReport { stats, unused })
}

/// Assign derived names and collect the conversions that are due.
fn plan(
    catalog: &mut Catalog,
    source_root: &Path,
    full_dir: &Path,
    thumbs_dir: &Path,
    used: &mut HashSet<String>,
    stats: &mut AssetStats,
    diags: &mut Diagnostics,
) -> Vec<ConvertParams> {
    let mut jobs = Vec::new();
    for species in &mut catalog.species {
        let species_dir = source_root.join(&species.path);
        let mut first = None;
        let mut chosen = None;

        for session in &mut species.sessions {
            session.derived = vec![None; session.images.len()];
            for (i, image) in session.images.iter().enumerate() {
                if !species.images.contains(image) {
                    stats.skipped += 1;
                    continue;
                }
                let name = naming::derived_image_name(&species.slug, image);
                if !used.insert(name.clone()) {
                    diags.error(
                        format!("{}/{image}", species.path),
                        format!("duplicated image name: {name}"),
                    );
                    stats.skipped += 1;
                    continue;
                }

                let source = species_dir.join(image);
                for (variant, dir) in [(Variant::Full, full_dir), (Variant::Thumbnail, thumbs_dir)] {
                    let output = dir.join(&name);
                    if is_fresh(&source, &output) {
                        stats.fresh += 1;
                    } else {
                        jobs.push(ConvertParams {
                            source: source.clone(),
                            output,
                            variant,
                        });
                    }
                }

                if *image == species.thumb && chosen.is_none() {
                    chosen = Some(name.clone());
                }
                first.get_or_insert_with(|| name.clone());
                session.derived[i] = Some(name);
            }
        }
        species.thumbnail = chosen.or(first);
    }
    jobs
}

/// Delete whatever a failed conversion left at `path`, so the next run sees
/// the output as missing.
fn discard_output(path: &Path, diags: &mut Diagnostics) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => diags.error(path.display().to_string(), format!("cannot remove: {e}")),
    }
}

/// `true` when `output` exists and is not older than `source`.
pub fn is_fresh(source: &Path, output: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified());
    match (modified(source), modified(output)) {
        (Ok(src), Ok(out)) => out >= src,
        _ => false,
    }
}

/// Report (and optionally delete) files in `dir` that are not in `used`.
fn sweep_unused(
    dir: &Path,
    used: &HashSet<String>,
    remove: bool,
    diags: &mut Diagnostics,
    events: &Option<Sender<AssetEvent>>,
) -> Result<Vec<PathBuf>, ProcessError> {
    let mut unused = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if used.contains(name.as_ref()) {
            continue;
        }

        let path = entry.path().to_path_buf();
        let mut removed = false;
        if remove {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) => diags.error(path.display().to_string(), format!("cannot remove: {e}")),
            }
        }
        diags.warning(
            path.display().to_string(),
            if removed { "unused image removed" } else { "unused image" },
        );
        send(events, AssetEvent::Unused {
            path: path.clone(),
            removed,
        });
        unused.push(path);
    }
    Ok(unused)
}

fn send(events: &Option<Sender<AssetEvent>>, event: AssetEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
