//! Validation and normalization.
//!
//! Stage 2 of the pipeline. Runs over the raw catalog produced by
//! [`crate::ingest`] and leaves it in a state the linker can rely on:
//!
//! 1. **Image resolution**: declared images that exist on disk become the
//!    species' canonical image set. Missing files are errors, undeclared
//!    `.jpg` files are warnings. The thumbnail falls back to the first
//!    resolved image (or empty).
//! 2. **Field lint**: casing and date-format checks, all warnings, plus a
//!    length check on the paired vernacular lists.
//! 3. **Group linkage**: each species joins the group at its parent path.
//!    Species without one are orphans and stay out of the linked graph.
//! 4. **Pruning**: groups left without members are dropped and every
//!    [`GroupId`] is remapped.
//!
//! Nothing here fails. Every finding lands in [`Diagnostics`].

use crate::config::SiteConfig;
use crate::diagnostics::Diagnostics;
use crate::types::{Catalog, GroupId, Species, SpeciesId};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static UPPER_LATIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]").unwrap());
static EPITHET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z1-9]").unwrap());
static UPPER_VERNACULAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-ZÄËÏÖÜ]").unwrap());
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,2}\.20[1-3][0-9]$").unwrap());

/// Run all validation passes over `catalog`.
pub fn validate(catalog: &mut Catalog, root: &Path, config: &SiteConfig, diags: &mut Diagnostics) {
    for species in &mut catalog.species {
        resolve_images(species, root, config.assets.ignore_images, diags);
        lint_species(species, &config.lint.strict_vernacular_dirs, diags);
    }
    link_groups(catalog, diags);
    prune_groups(catalog);
}

/// Build the canonical image set and choose the thumbnail.
pub fn resolve_images(species: &mut Species, root: &Path, ignore_images: bool, diags: &mut Diagnostics) {
    let dir = root.join(&species.path);
    let mut resolved: Vec<String> = Vec::new();
    for image in species.sessions.iter().flat_map(|s| &s.images) {
        if resolved.contains(image) {
            continue;
        }
        if ignore_images || dir.join(image).is_file() {
            resolved.push(image.clone());
        } else {
            diags.error(join(&species.path, image), "image file doesn't exist");
        }
    }

    species.thumb = match &species.declared_thumb {
        Some(thumb) if resolved.contains(thumb) => thumb.clone(),
        _ => resolved.first().cloned().unwrap_or_default(),
    };

    if !ignore_images {
        report_undeclared(&dir, &species.path, &resolved, diags);
    }
    species.images = resolved;
}

fn report_undeclared(dir: &Path, rel: &str, resolved: &[String], diags: &mut Diagnostics) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut undeclared: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| is_jpg(name) && !resolved.contains(name))
        .collect();
    undeclared.sort();
    for name in undeclared {
        diags.warning(join(rel, &name), "image file not in database");
    }
}

fn is_jpg(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"))
}

/// Formatting checks on one species. `strict_dirs` lists the top-level
/// directories whose species also get the vernacular naming rules.
pub fn lint_species(species: &Species, strict_dirs: &[String], diags: &mut Diagnostics) {
    let path = species.path.as_str();
    check(diags, path, &species.family, &UPPER_LATIN, "family");
    check(diags, path, &species.genus, &UPPER_LATIN, "genus");
    check(diags, path, &species.species, &EPITHET, "species");
    check(diags, path, &species.vernacular_family, &UPPER_VERNACULAR, "vernacular family");
    for name in &species.vernacular_genus {
        check(diags, path, name, &UPPER_VERNACULAR, "vernacular genus");
    }
    for name in &species.vernacular_species {
        check(diags, path, name, &UPPER_VERNACULAR, "vernacular species");
    }
    for session in &species.sessions {
        if let Some(date) = &session.date {
            if !DATE.is_match(date) {
                diags.warning(path, format!("bad date format: {date}"));
            }
        }
        if let Some(location) = &session.location {
            check(diags, path, location, &UPPER_VERNACULAR, "location");
        }
    }

    if species.vernacular_genus.len() != species.vernacular_species.len() {
        diags.error(path, "different number of vernacular genus and species names");
    }

    let top = path.split('/').next().unwrap_or_default();
    if strict_dirs.iter().any(|d| d == top) {
        for (genus, epithet) in species.vernacular_genus.iter().zip(&species.vernacular_species) {
            if !genus.is_empty() && epithet.is_empty() {
                diags.warning(path, format!("vernacular genus without species: {genus}"));
            } else if epithet.contains(' ') && !epithet.ends_with('-') {
                diags.warning(path, format!("vernacular subspecies without hyphen: {epithet}"));
            }
        }
    }
}

fn check(diags: &mut Diagnostics, path: &str, value: &str, pattern: &Regex, what: &str) {
    if !value.is_empty() && !pattern.is_match(value) {
        diags.warning(path, format!("bad {what} format: {value}"));
    }
}

/// Attach every species to the group at its parent path.
pub fn link_groups(catalog: &mut Catalog, diags: &mut Diagnostics) {
    let by_path: HashMap<&str, usize> = catalog
        .groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.path.as_str(), i))
        .collect();

    let mut links = Vec::new();
    for (i, species) in catalog.species.iter().enumerate() {
        match by_path.get(species.group_path.as_str()) {
            Some(&g) => links.push((SpeciesId(i), GroupId(g))),
            None => diags.warning(&species.path, "species without group"),
        }
    }

    for (sid, gid) in links {
        let members = &mut catalog.groups[gid.0].species;
        if members.contains(&sid) {
            diags.error(&catalog.species[sid.0].path, "duplicated species in group");
        } else {
            members.push(sid);
        }
        catalog.species[sid.0].group = Some(gid);
    }
}

/// Drop groups without members and remap group handles. A group's
/// `parent` moves up to the nearest surviving ancestor group.
pub fn prune_groups(catalog: &mut Catalog) {
    let parents: HashMap<String, Option<String>> = catalog
        .groups
        .iter()
        .map(|g| (g.path.clone(), g.parent.clone()))
        .collect();

    let old = std::mem::take(&mut catalog.groups);
    let mut remap = vec![None; old.len()];
    for (i, group) in old.into_iter().enumerate() {
        if group.species.is_empty() {
            tracing::debug!(path = %group.path, "pruning empty group");
            continue;
        }
        remap[i] = Some(GroupId(catalog.groups.len()));
        catalog.groups.push(group);
    }

    for species in &mut catalog.species {
        species.group = species.group.and_then(|g| remap[g.0]);
    }

    let surviving: Vec<String> = catalog.groups.iter().map(|g| g.path.clone()).collect();
    for group in &mut catalog.groups {
        let mut parent = group.parent.take();
        while let Some(p) = parent.as_deref() {
            if surviving.iter().any(|s| s == p) {
                break;
            }
            parent = parents.get(p).cloned().flatten();
        }
        group.parent = parent;
    }
}

fn join(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}
