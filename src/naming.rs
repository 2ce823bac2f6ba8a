//! Identity allocation and filename conventions.
//!
//! Every group and species gets a slug: a lowercase, filesystem-safe name
//! used by the renderer for page files and by the asset pipeline for derived
//! image names.
//!
//! ## Slug rule
//!
//! - Species with both `genus` and `species` → `"{genus}-{species}"`
//! - Everything else → path segments joined with `-`
//!
//! Then every run of characters outside `[A-Za-z0-9]` becomes a single `-`,
//! the result is lowercased and a leading `-` is stripped:
//!
//! - `Viola` + `odorata` → `viola-odorata`
//! - `Viola` + `x wittrockiana` → `viola-x-wittrockiana`
//! - `plants/blue` → `plants-blue`
//!
//! ## Collisions
//!
//! [`SlugRegistry`] remembers every slug handed out. The first entity to
//! claim a slug keeps it; later claimants are reported and keep their
//! computed, unregistered slug, so the collision stays visible in the output
//! instead of being silently renamed.
//!
//! ## Display Titles
//!
//! Directory names may carry an ordering prefix (`NNN-`). When a group has
//! no explicit title, its directory name is shown with the prefix removed
//! and dashes converted to spaces: `020-Blue-flowers` → "Blue flowers".

use std::collections::HashSet;

/// Fallback slug for entities whose source text normalizes to nothing
/// (the root group).
const ROOT_SLUG: &str = "root";

/// Normalize arbitrary text into slug form.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_gap = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }
    match slug.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None => slug,
    }
}

/// Slug for a species header or group path.
///
/// `taxon` is `Some((genus, epithet))` only when the entity carries both
/// fields; otherwise the path segments are used.
pub fn entity_slug(taxon: Option<(&str, &str)>, path: &str) -> String {
    let raw = match taxon {
        Some((genus, epithet)) => format!("{genus}-{epithet}"),
        None => path.split('/').collect::<Vec<_>>().join("-"),
    };
    let slug = slugify(&raw);
    if slug.is_empty() {
        ROOT_SLUG.to_string()
    } else {
        slug
    }
}

/// Process-wide set of allocated slugs.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `slug`. Returns `false` if another entity already holds it.
    pub fn claim(&mut self, slug: &str) -> bool {
        if self.taken.contains(slug) {
            false
        } else {
            self.taken.insert(slug.to_string());
            true
        }
    }
}

/// Output filename for a derived image.
///
/// Keeps only the digits of the source filename and appends them to the
/// species slug: `viola-odorata` + `IMG_0042.JPG` → `viola-odorata-0042.jpg`.
/// Repeated hyphens are collapsed.
pub fn derived_image_name(species_slug: &str, source_filename: &str) -> String {
    let digits: String = source_filename
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    collapse_hyphens(&format!("{species_slug}-{digits}.jpg"))
}

fn collapse_hyphens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Name without its `NNN-` ordering prefix. A name made only of digits
/// yields `""`.
fn strip_order_prefix(name: &str) -> &str {
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match name.split_once('-') {
        Some((prefix, rest)) if is_number(prefix) => rest,
        _ if is_number(name) => "",
        _ => name,
    }
}

/// Title shown for a group that declares none: the last path segment with
/// its prefix removed and dashes turned into spaces, or the raw segment when
/// the prefix is all there is.
pub fn fallback_title(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or(path);
    match strip_order_prefix(last) {
        "" => last.to_string(),
        name => name.replace('-', " "),
    }
}
