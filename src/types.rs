//! Entities shared by every pipeline phase.
//!
//! Groups and species reference each other (membership, owning group,
//! previous/next navigation). Rather than owning pointers in both
//! directions, all entities live in the two arenas of a [`Catalog`] and
//! refer to each other through [`GroupId`] / [`SpeciesId`] handles. The
//! handles are plain indices, which is also how they appear in the
//! serialized site manifest.

use crate::records::{GroupHeader, SessionRecord, SpeciesHeader};
use serde::Serialize;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeciesId(pub usize);

/// A named collection node, created from a group header.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    /// Directory path relative to the source root, `/`-separated.
    pub path: String,
    pub title: String,
    /// Custom template the renderer should use for this group's page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Child directories visited first, in this order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listdir: Vec<String>,
    /// Path of the group that follows this one in navigation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_group: Option<String>,
    /// Path of the nearest enclosing group that survived pruning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub slug: String,
    /// Members, sorted by slug once linked.
    pub species: Vec<SpeciesId>,
    pub prev: Option<GroupId>,
    pub next: Option<GroupId>,
}

impl Group {
    pub fn from_header(path: String, title: String, slug: String, header: GroupHeader) -> Self {
        Self {
            path,
            title,
            template: header.group_template.filter(|t| !t.is_empty()),
            listdir: header.listdir.unwrap_or_default(),
            next_group: header.next_group.filter(|p| !p.is_empty()),
            parent: None,
            slug,
            species: Vec::new(),
            prev: None,
            next: None,
        }
    }
}

/// One observation event with its images.
///
/// `derived` is index-aligned with `images`: entry `i` holds the output
/// filename produced for `images[i]`, or `None` when that image was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoSession {
    pub images: Vec<String>,
    pub derived: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl From<SessionRecord> for PhotoSession {
    fn from(record: SessionRecord) -> Self {
        let images = record.images.unwrap_or_default();
        Self {
            derived: vec![None; images.len()],
            images,
            date: record.date,
            location: record.location,
        }
    }
}

/// One documented species.
///
/// Taxonomic fields are normalized on construction: absent values become
/// empty strings and vernacular genus/species are always lists.
#[derive(Debug, Clone, Serialize)]
pub struct Species {
    /// Directory path relative to the source root.
    pub path: String,
    /// Parent directory path; the group this species belongs to.
    pub group_path: String,
    pub genus: String,
    pub species: String,
    pub family: String,
    pub order: String,
    pub vernacular_genus: Vec<String>,
    pub vernacular_species: Vec<String>,
    pub vernacular_family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_tag: Option<String>,
    pub slug: String,
    pub group: Option<GroupId>,
    /// Thumbnail filename as written in the header.
    #[serde(skip)]
    pub declared_thumb: Option<String>,
    /// Source image chosen as thumbnail; empty when the species has no images.
    pub thumb: String,
    /// Derived filename of the thumbnail image, set by the asset pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Declared images that exist on disk, in declaration order.
    pub images: Vec<String>,
    pub sessions: Vec<PhotoSession>,
    pub prev: Option<SpeciesId>,
    pub next: Option<SpeciesId>,
}

impl Species {
    pub fn from_header(
        path: String,
        group_path: String,
        slug: String,
        header: SpeciesHeader,
        sessions: Vec<SessionRecord>,
    ) -> Self {
        Self {
            path,
            group_path,
            genus: header.genus.unwrap_or_default(),
            species: header.species.unwrap_or_default(),
            family: header.family.unwrap_or_default(),
            order: header.order.unwrap_or_default(),
            vernacular_genus: header.vernacular_genus.unwrap_or_else(|| vec![String::new()]),
            vernacular_species: header
                .vernacular_species
                .unwrap_or_else(|| vec![String::new()]),
            vernacular_family: header.vernacular_family.unwrap_or_default(),
            index_tag: header.index_tag,
            slug,
            group: None,
            declared_thumb: header.thumb.filter(|t| !t.is_empty()),
            thumb: String::new(),
            thumbnail: None,
            images: Vec::new(),
            sessions: sessions.into_iter().map(PhotoSession::from).collect(),
            prev: None,
            next: None,
        }
    }

    /// `"Genus species"`, trimmed.
    pub fn scientific_name(&self) -> String {
        format!("{} {}", self.genus, self.species).trim().to_string()
    }

    /// Vernacular display names: genus and species entries paired by
    /// position, joined with a space and trimmed.
    pub fn vernacular_names(&self) -> Vec<String> {
        self.vernacular_genus
            .iter()
            .zip(&self.vernacular_species)
            .map(|(genus, species)| format!("{genus} {species}").trim().to_string())
            .collect()
    }
}

/// Arena holding every entity of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub groups: Vec<Group>,
    pub species: Vec<Species>,
    /// Group navigation order, set by the linker.
    pub group_order: Vec<GroupId>,
    /// Flattened species navigation order, set by the linker.
    pub species_order: Vec<SpeciesId>,
}

impl Catalog {
    pub fn group_by_path(&self, path: &str) -> Option<GroupId> {
        self.groups.iter().position(|g| g.path == path).map(GroupId)
    }

    pub fn species_by_slug(&self, slug: &str) -> Option<SpeciesId> {
        self.species.iter().position(|s| s.slug == slug).map(SpeciesId)
    }

    /// Species attached to a surviving group, in arena order.
    pub fn linked_species(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.species
            .iter()
            .enumerate()
            .filter(|(_, s)| s.group.is_some())
            .map(|(i, _)| SpeciesId(i))
    }
}

impl Index<GroupId> for Catalog {
    type Output = Group;

    fn index(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }
}

impl IndexMut<GroupId> for Catalog {
    fn index_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id.0]
    }
}

impl Index<SpeciesId> for Catalog {
    type Output = Species;

    fn index(&self, id: SpeciesId) -> &Species {
        &self.species[id.0]
    }
}

impl IndexMut<SpeciesId> for Catalog {
    fn index_mut(&mut self, id: SpeciesId) -> &mut Species {
        &mut self.species[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(genus: &str, species: &str) -> SpeciesHeader {
        SpeciesHeader {
            genus: Some(genus.to_string()),
            species: Some(species.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn absent_fields_default_to_empty() {
        let s = Species::from_header(
            "a/b".into(),
            "a".into(),
            "b".into(),
            SpeciesHeader::default(),
            vec![],
        );
        assert_eq!(s.genus, "");
        assert_eq!(s.family, "");
        assert_eq!(s.vernacular_genus, vec![String::new()]);
        assert_eq!(s.vernacular_species, vec![String::new()]);
        assert_eq!(s.declared_thumb, None);
    }

    #[test]
    fn session_derived_names_start_aligned() {
        let session = PhotoSession::from(SessionRecord {
            images: Some(vec!["1.jpg".into(), "2.jpg".into()]),
            ..Default::default()
        });
        assert_eq!(session.derived, vec![None, None]);
    }

    #[test]
    fn vernacular_names_pair_by_position() {
        let mut h = header("Viola", "odorata");
        h.vernacular_genus = Some(vec!["Veilchen".into(), "Duft".into()]);
        h.vernacular_species = Some(vec!["März-".into(), "".into()]);
        let s = Species::from_header("p".into(), "".into(), "viola-odorata".into(), h, vec![]);
        assert_eq!(s.vernacular_names(), vec!["Veilchen März-", "Duft"]);
        assert_eq!(s.scientific_name(), "Viola odorata");
    }

    #[test]
    fn catalog_lookups() {
        let mut catalog = Catalog::default();
        catalog.species.push(Species::from_header(
            "x/a".into(),
            "x".into(),
            "viola-alba".into(),
            header("Viola", "alba"),
            vec![],
        ));
        assert_eq!(catalog.species_by_slug("viola-alba"), Some(SpeciesId(0)));
        assert_eq!(catalog.group_by_path("x"), None);
        assert_eq!(catalog.linked_species().count(), 0);
        assert_eq!(catalog[SpeciesId(0)].genus, "Viola");
    }
}
