//! Shared test utilities for the herbarium test suite.
//!
//! Two kinds of helpers:
//!
//! - **On-disk fixtures** for ingest and asset tests: [`write_index`] and
//!   [`touch_image`] build a source tree inside a `TempDir`.
//! - **In-memory entities** for validate/link/index tests: [`group`],
//!   [`species`] and [`catalog_from`] skip ingest entirely.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut catalog = catalog_from(
//!     vec![group("plants/blue")],
//!     vec![species("plants/blue/viola", "Viola", "odorata")],
//! );
//! link_groups(&mut catalog, &mut diags);
//! link(&mut catalog, &mut diags);
//! assert_group_ring(&catalog);
//! ```

use std::fs;
use std::path::Path;

use crate::naming::{entity_slug, fallback_title};
use crate::records::{GroupHeader, SessionRecord, SpeciesHeader};
use crate::types::{Catalog, Group, GroupId, Species, SpeciesId};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `index.txt` into `root/rel`, creating directories. `rel = ""`
/// writes the root index document.
pub fn write_index(root: &Path, rel: &str, yaml: &str) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("index.txt"), yaml).unwrap();
}

/// Create an empty image file at `root/rel`, creating directories.
pub fn touch_image(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"jpeg").unwrap();
}

// =========================================================================
// In-memory entities
// =========================================================================

/// A group at `path` with its fallback title and path slug.
pub fn group(path: &str) -> Group {
    Group::from_header(
        path.to_string(),
        fallback_title(path),
        entity_slug(None, path),
        GroupHeader::default(),
    )
}

/// A species at `path` with one empty photo session. The group path is the
/// parent directory.
pub fn species(path: &str, genus: &str, epithet: &str) -> Species {
    let group_path = path.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
    let header = SpeciesHeader {
        genus: Some(genus.to_string()),
        species: Some(epithet.to_string()),
        ..Default::default()
    };
    Species::from_header(
        path.to_string(),
        group_path.to_string(),
        entity_slug(Some((genus, epithet)), path),
        header,
        vec![SessionRecord::default()],
    )
}

/// Arena with the given entities, unlinked.
pub fn catalog_from(groups: Vec<Group>, species: Vec<Species>) -> Catalog {
    Catalog {
        groups,
        species,
        ..Default::default()
    }
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a group by path. Panics if not found.
pub fn find_group<'a>(catalog: &'a Catalog, path: &str) -> &'a Group {
    catalog
        .groups
        .iter()
        .find(|g| g.path == path)
        .unwrap_or_else(|| {
            let paths: Vec<&str> = catalog.groups.iter().map(|g| g.path.as_str()).collect();
            panic!("group '{path}' not found. Available: {paths:?}")
        })
}

/// Find a species by slug. Panics if not found.
pub fn find_species<'a>(catalog: &'a Catalog, slug: &str) -> &'a Species {
    catalog
        .species
        .iter()
        .find(|s| s.slug == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = catalog.species.iter().map(|s| s.slug.as_str()).collect();
            panic!("species '{slug}' not found. Available: {slugs:?}")
        })
}

// =========================================================================
// Navigation assertions
// =========================================================================

/// Assert the groups in `group_order` form one closed ring: following `next`
/// visits each exactly once and `prev` inverts `next`.
pub fn assert_group_ring(catalog: &Catalog) {
    let order = &catalog.group_order;
    if order.is_empty() {
        return;
    }
    let mut current = order[0];
    for (step, &expected) in order.iter().enumerate() {
        assert_eq!(current, expected, "group ring diverges at step {step}");
        let next: GroupId = catalog[current].next.expect("group without next");
        assert_eq!(catalog[next].prev, Some(current), "prev does not invert next");
        current = next;
    }
    assert_eq!(current, order[0], "group ring does not close");
}

/// Same as [`assert_group_ring`] for `species_order`.
pub fn assert_species_ring(catalog: &Catalog) {
    let order = &catalog.species_order;
    if order.is_empty() {
        return;
    }
    let mut current = order[0];
    for (step, &expected) in order.iter().enumerate() {
        assert_eq!(current, expected, "species ring diverges at step {step}");
        let next: SpeciesId = catalog[current].next.expect("species without next");
        assert_eq!(catalog[next].prev, Some(current), "prev does not invert next");
        current = next;
    }
    assert_eq!(current, order[0], "species ring does not close");
}
