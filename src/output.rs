//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity (group, species) is its semantic identity: positional
//! index and title or scientific name. Source paths and slugs are shown as
//! secondary context on indented lines.
//!
//! # Output Format
//!
//! ## Catalog
//!
//! ```text
//! Groups
//! 001 Blue flowers (2 species)
//!     Source: plants/blue/
//!     001 Viola alba
//!         Slug: viola-alba
//!     002 Viola odorata (Veilchen März-)
//!         Slug: viola-odorata
//!         Images: 2
//!
//! Orphans
//!     Myosotis arvensis (wild/myosotis/)
//! ```
//!
//! ## Process
//!
//! ```text
//! 12 conversions planned, 40 outputs fresh
//!     full: images/viola-odorata-1.jpg
//!     thumb: thumbs/viola-odorata-1.jpg FAILED (convert exited with ...)
//!     unused: images/old-7.jpg
//! ```
//!
//! ## Indexes
//!
//! ```text
//! index-genus: 2 keys, 3 entries
//!     M (1)
//!     V (2)
//! ```
//!
//! ## Diagnostics
//!
//! ```text
//! error: image file doesn't exist (plants/blue/viola/3.jpg)
//! warning: bad genus format: viola (plants/blue/viola)
//! 1 error, 1 warning
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::diagnostics::Diagnostics;
use crate::indexes::Index;
use crate::process::AssetEvent;
use crate::types::{Catalog, Species};
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title, with optional count.
///
/// ```text
/// 001 Blue flowers (5 species)
/// 001 Viola odorata
/// ```
fn entity_header(index: usize, title: &str, count: Option<usize>) -> String {
    match count {
        Some(n) => format!("{} {} ({} species)", format_index(index), title, n),
        None => format!("{} {}", format_index(index), title),
    }
}

/// Scientific name, with the first vernacular name in parens when present.
fn species_title(species: &Species) -> String {
    let scientific = species.scientific_name();
    let scientific = if scientific.is_empty() {
        species.path.clone()
    } else {
        scientific
    };
    match species.vernacular_names().into_iter().find(|n| !n.is_empty()) {
        Some(name) => format!("{scientific} ({name})"),
        None => scientific,
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Format the linked catalog in navigation order.
pub fn format_catalog(catalog: &Catalog) -> Vec<String> {
    let mut lines = vec!["Groups".to_string()];

    for (gi, &gid) in catalog.group_order.iter().enumerate() {
        let group = &catalog[gid];
        lines.push(entity_header(gi + 1, &group.title, Some(group.species.len())));
        lines.push(format!("{}Source: {}/", indent(1), group.path));
        for (si, &sid) in group.species.iter().enumerate() {
            let species = &catalog[sid];
            lines.push(format!(
                "{}{}",
                indent(1),
                entity_header(si + 1, &species_title(species), None)
            ));
            lines.push(format!("{}Slug: {}", indent(2), species.slug));
            if !species.images.is_empty() {
                lines.push(format!("{}Images: {}", indent(2), species.images.len()));
            }
        }
    }

    let orphans: Vec<&Species> = catalog.species.iter().filter(|s| s.group.is_none()).collect();
    if !orphans.is_empty() {
        lines.push(String::new());
        lines.push("Orphans".to_string());
        for species in orphans {
            lines.push(format!(
                "{}{} ({}/)",
                indent(1),
                species.scientific_name(),
                species.path
            ));
        }
    }

    lines
}

/// Print the catalog to stdout.
pub fn print_catalog(catalog: &Catalog) {
    for line in format_catalog(catalog) {
        println!("{}", line);
    }
}

// ============================================================================
// Asset pipeline
// ============================================================================

/// Format a single asset progress event. Output paths are shown relative to
/// `output_root` when possible.
pub fn format_asset_event(event: &AssetEvent, output_root: &Path) -> Vec<String> {
    let rel = |p: &Path| p.strip_prefix(output_root).unwrap_or(p).display().to_string();
    match event {
        AssetEvent::Planned { jobs, fresh } => vec![format!(
            "{} planned, {} fresh",
            plural(*jobs, "conversion"),
            plural(*fresh, "output")
        )],
        AssetEvent::Converted { output, variant } => {
            vec![format!("{}{}: {}", indent(1), variant, rel(output))]
        }
        AssetEvent::Failed {
            output,
            variant,
            message,
        } => vec![format!(
            "{}{}: {} FAILED ({})",
            indent(1),
            variant,
            rel(output),
            message
        )],
        AssetEvent::Unused { path, removed } => {
            let label = if *removed { "removed" } else { "unused" };
            vec![format!("{}{}: {}", indent(1), label, rel(path))]
        }
    }
}

// ============================================================================
// Indexes
// ============================================================================

/// Format key counts for every index.
pub fn format_indexes(indexes: &[Index]) -> Vec<String> {
    let mut lines = Vec::new();
    for index in indexes {
        let entries: usize = index.entries.values().map(Vec::len).sum();
        let entries = if entries == 1 {
            "1 entry".to_string()
        } else {
            format!("{entries} entries")
        };
        lines.push(format!(
            "{}: {}, {}",
            index.name,
            plural(index.len(), "key"),
            entries
        ));
        for key in &index.keys {
            lines.push(format!(
                "{}{} ({})",
                indent(1),
                key,
                index.species_for(key).len()
            ));
        }
    }
    lines
}

/// Print index summaries to stdout.
pub fn print_indexes(indexes: &[Index]) {
    for line in format_indexes(indexes) {
        println!("{}", line);
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Format every diagnostic followed by a count line.
pub fn format_diagnostics(diags: &Diagnostics) -> Vec<String> {
    if diags.is_empty() {
        return vec!["No problems found".to_string()];
    }
    let mut lines: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
    lines.push(format!(
        "{}, {}",
        plural(diags.errors().count(), "error"),
        plural(diags.warnings().count(), "warning")
    ));
    lines
}

/// Print diagnostics to stdout.
pub fn print_diagnostics(diags: &Diagnostics) {
    for line in format_diagnostics(diags) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Variant;
    use crate::test_helpers::{catalog_from, group, species};
    use crate::validate::link_groups;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[test]
    fn format_index_zero_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
    }

    #[test]
    fn catalog_lists_groups_in_chain_order() {
        let mut g = group("plants/blue");
        g.title = "Blue flowers".into();
        let mut viola = species("plants/blue/viola", "Viola", "odorata");
        viola.vernacular_genus = vec!["Veilchen".into()];
        viola.vernacular_species = vec!["März-".into()];
        viola.images = vec!["1.jpg".into(), "2.jpg".into()];
        let mut catalog = catalog_from(
            vec![g],
            vec![viola, species("wild/myosotis", "Myosotis", "arvensis")],
        );
        let mut diags = Diagnostics::new();
        link_groups(&mut catalog, &mut diags);
        crate::link::link(&mut catalog, &mut diags);

        let lines = format_catalog(&catalog);
        assert_eq!(
            lines,
            vec![
                "Groups",
                "001 Blue flowers (1 species)",
                "    Source: plants/blue/",
                "    001 Viola odorata (Veilchen März-)",
                "        Slug: viola-odorata",
                "        Images: 2",
                "",
                "Orphans",
                "    Myosotis arvensis (wild/myosotis/)",
            ]
        );
    }

    #[test]
    fn asset_events_use_relative_paths() {
        let root = Path::new("/out");
        let lines = format_asset_event(
            &AssetEvent::Converted {
                output: PathBuf::from("/out/images/viola-odorata-1.jpg"),
                variant: Variant::Full,
            },
            root,
        );
        assert_eq!(lines, vec!["    full: images/viola-odorata-1.jpg"]);

        let lines = format_asset_event(
            &AssetEvent::Failed {
                output: PathBuf::from("/out/thumbs/x-1.jpg"),
                variant: Variant::Thumbnail,
                message: "boom".into(),
            },
            root,
        );
        assert_eq!(lines, vec!["    thumb: thumbs/x-1.jpg FAILED (boom)"]);

        let lines = format_asset_event(&AssetEvent::Planned { jobs: 1, fresh: 3 }, root);
        assert_eq!(lines, vec!["1 conversion planned, 3 outputs fresh"]);
    }

    #[test]
    fn unused_event_labels() {
        let lines = format_asset_event(
            &AssetEvent::Unused {
                path: PathBuf::from("/out/images/old-7.jpg"),
                removed: true,
            },
            Path::new("/out"),
        );
        assert_eq!(lines, vec!["    removed: images/old-7.jpg"]);
    }

    #[test]
    fn indexes_show_key_counts() {
        use crate::types::SpeciesId;
        let mut entries = BTreeMap::new();
        entries.insert("V".to_string(), vec![SpeciesId(0), SpeciesId(1)]);
        let index = Index {
            name: "index-genus".into(),
            keys: vec!["V".into()],
            entries,
        };
        assert_eq!(
            format_indexes(&[index]),
            vec!["index-genus: 1 key, 2 entries", "    V (2)"]
        );
    }

    #[test]
    fn diagnostics_with_summary() {
        let mut diags = Diagnostics::new();
        diags.error("a/b/3.jpg", "image file doesn't exist");
        diags.warning("a/b", "bad genus format: viola");
        diags.warning("a/c", "species without group");
        assert_eq!(
            format_diagnostics(&diags),
            vec![
                "error: image file doesn't exist (a/b/3.jpg)",
                "warning: bad genus format: viola (a/b)",
                "warning: species without group (a/c)",
                "1 error, 2 warnings",
            ]
        );
    }

    #[test]
    fn no_diagnostics_message() {
        assert_eq!(format_diagnostics(&Diagnostics::new()), vec!["No problems found"]);
    }
}
