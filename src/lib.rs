//! # Herbarium
//!
//! Turns a directory tree of hand-written species records and field photos
//! into a browsable catalog: groups and species linked into navigation
//! chains, alternate indexes, and resized copies of every photo.
//!
//! # Architecture: Phased Pipeline
//!
//! ```text
//! 1. Ingest     source/  →  raw groups + species   (YAML index documents)
//! 2. Validate   catalog  →  resolved images, lint, group membership, pruning
//! 3. Link       catalog  →  circular group chain + flattened species chain
//! 4. Indexes    catalog  →  keyed partitions (genus, family, date, ...)
//! 5. Process    catalog  →  docs/images + docs/thumbs (external converter)
//! ```
//!
//! Each phase consumes the fully materialized output of the one before it.
//! Indexes and image processing both depend only on the linked catalog.
//!
//! Bad data never stops a run. Every phase records what it finds as a
//! [`diagnostics::Diagnostic`] and carries on with a documented fallback, so
//! the navigation graph and indexes are always consistent even when the
//! records are not.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ingest`] | Phase 1: ordered directory traversal, header classification |
//! | [`records`] | Typed YAML records for group headers, species headers and photo sessions |
//! | [`validate`] | Phase 2: image resolution, field lint, group linkage, pruning |
//! | [`link`] | Phase 3: navigation chains with `next_group` overrides |
//! | [`indexes`] | Phase 4: keyed partitions of the species set |
//! | [`process`] | Phase 5: derived image names, freshness checks, parallel conversion |
//! | [`pipeline`] | Runs the phases and assembles the renderer-facing [`pipeline::Site`] |
//! | [`types`] | Arena entities: `Group`, `Species`, `PhotoSession`, `Catalog` |
//! | [`naming`] | Slugs, slug registry, derived image names, display titles |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`imaging`] | `ImageTool` trait and the external converter backend |
//! | [`diagnostics`] | Structured error/warning records |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Arena Instead of Pointers
//!
//! Species point at their group, groups list their species, and both carry
//! `prev`/`next` navigation links. All of them live in two `Vec`s inside a
//! [`types::Catalog`] and refer to each other by index. The same indices
//! appear in the serialized `site.json`.
//!
//! ## External Converter
//!
//! Photos are converted by an external program (ImageMagick's `convert` by
//! default) called once per output without a shell. The options live in
//! `config.toml`, so changing sizes or quality needs no rebuild.
//!
//! ## Freshness by Modification Time
//!
//! A derived image is rebuilt only when it is missing or older than its
//! source. Interrupted runs are safe to repeat and an unchanged tree converts
//! nothing.

pub mod config;
pub mod diagnostics;
pub mod imaging;
pub mod indexes;
pub mod ingest;
pub mod link;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod records;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
