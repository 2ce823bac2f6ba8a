//! Record ingestion.
//!
//! Stage 1 of the pipeline. Walks the source tree depth-first and turns
//! every index document into a raw [`Group`] or [`Species`].
//!
//! ## Directory Structure
//!
//! ```text
//! source/                          # Source root
//! ├── config.toml                  # Site configuration (optional)
//! ├── index.txt                    # Root group header (optional)
//! ├── static/                      # Never traversed
//! ├── blumen/
//! │   ├── index.txt                # group_title + listdir: [blau, gelb]
//! │   ├── gelb/                    # Visited second (listed)
//! │   ├── blau/                    # Visited first (listed)
//! │   │   ├── index.txt            # group_title: Blue flowers
//! │   │   └── viola-odorata/
//! │   │       ├── index.txt        # species header + photo sessions
//! │   │       ├── 1.jpg
//! │   │       └── 2.jpg
//! │   └── weiss/                   # Not listed: visited last, lexically
//! └── tiere/
//! ```
//!
//! ## Traversal Order
//!
//! A group that declares `listdir` has exactly those children visited first,
//! in the declared order; every listed name that is not a subdirectory is
//! reported. All remaining subdirectories follow in lexical order. Entries
//! whose names start with `.` are skipped.
//!
//! Slugs are claimed as entities are created, so traversal order decides
//! which of two colliding entities keeps its slug.

use crate::config::SiteConfig;
use crate::diagnostics::Diagnostics;
use crate::naming::{self, SlugRegistry};
use crate::records::{self, Document, Header, RecordError};
use crate::types::{Catalog, Group, Species};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot read source root {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: RecordError,
    },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read every index document under `root` into a raw catalog.
///
/// Only an unreadable root, or a root document that is not valid YAML,
/// returns `Err`; everything else becomes a diagnostic.
pub fn ingest(
    root: &Path,
    config: &SiteConfig,
    registry: &mut SlugRegistry,
    diags: &mut Diagnostics,
) -> Result<Catalog, IngestError> {
    let mut walker = Walker {
        root,
        config,
        registry,
        diags,
        catalog: Catalog::default(),
    };
    walker.visit("", None)?;
    tracing::info!(
        groups = walker.catalog.groups.len(),
        species = walker.catalog.species.len(),
        "ingested source tree"
    );
    Ok(walker.catalog)
}

struct Walker<'a> {
    root: &'a Path,
    config: &'a SiteConfig,
    registry: &'a mut SlugRegistry,
    diags: &'a mut Diagnostics,
    catalog: Catalog,
}

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

impl Walker<'_> {
    /// Visit the directory at `rel` (relative to the root, `""` for the root).
    /// `enclosing` is the path of the nearest group above it.
    fn visit(&mut self, rel: &str, enclosing: Option<&str>) -> Result<(), IngestError> {
        let dir = self.root.join(rel);
        let entries = match collect_entries(&dir) {
            Ok(entries) => entries,
            Err(source) if rel.is_empty() => {
                return Err(IngestError::SourceUnreadable { path: dir, source });
            }
            Err(e) => {
                self.diags.error(rel, format!("cannot read directory: {e}"));
                return Ok(());
            }
        };

        let mut group_path = enclosing.map(str::to_string);
        let mut listdir = Vec::new();

        if let Some(doc_path) = self.index_document(rel, &entries) {
            match self.read_document(rel, &doc_path)? {
                Some(Document {
                    header: Header::Group(header),
                    ..
                }) => {
                    listdir = header.listdir.clone().unwrap_or_default();
                    self.add_group(rel, enclosing, header);
                    group_path = Some(rel.to_string());
                }
                Some(Document {
                    header: Header::Species(header),
                    sessions,
                }) => self.add_species(rel, header, sessions),
                None => {}
            }
        }

        let subdirs: Vec<&str> = entries
            .iter()
            .filter(|e| e.is_dir)
            .filter(|e| !(rel.is_empty() && e.name == self.config.static_dir))
            .map(|e| e.name.as_str())
            .collect();

        let mut visited = HashSet::new();
        for name in &listdir {
            if !subdirs.contains(&name.as_str()) {
                self.diags
                    .error(join(rel, name), "listed directory doesn't exist");
                continue;
            }
            if visited.insert(name.as_str()) {
                self.visit(&join(rel, name), group_path.as_deref())?;
            }
        }
        for name in subdirs {
            if !visited.contains(name) {
                self.visit(&join(rel, name), group_path.as_deref())?;
            }
        }
        Ok(())
    }

    /// The index document of a directory, matched ignoring ASCII case.
    fn index_document(&mut self, rel: &str, entries: &[Entry]) -> Option<PathBuf> {
        let mut candidates = entries
            .iter()
            .filter(|e| !e.is_dir && e.name.eq_ignore_ascii_case(&self.config.index_file));
        let first = candidates.next()?;
        if candidates.next().is_some() {
            self.diags.warning(
                join(rel, &first.name),
                "several index documents, using this one",
            );
        }
        Some(first.path.clone())
    }

    /// Parse one index document. Unparseable documents are reported and
    /// yield `None`, except at the root where they abort the run.
    fn read_document(&mut self, rel: &str, path: &Path) -> Result<Option<Document>, IngestError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if rel.is_empty() => {
                return Err(IngestError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                self.diags.error(rel, format!("cannot read index document: {e}"));
                return Ok(None);
            }
        };
        match records::parse_document(&text) {
            Ok(doc) => Ok(Some(doc)),
            Err(source @ RecordError::Yaml(_)) if rel.is_empty() => Err(IngestError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) => {
                self.diags.error(rel, e.to_string());
                Ok(None)
            }
        }
    }

    fn add_group(&mut self, rel: &str, enclosing: Option<&str>, header: records::GroupHeader) {
        let slug = self.allocate(None, rel);
        let title = header
            .group_title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| naming::fallback_title(rel));
        let mut group = Group::from_header(rel.to_string(), title, slug, header);
        group.parent = enclosing.map(str::to_string);
        tracing::debug!(path = rel, slug = %group.slug, "group");
        self.catalog.groups.push(group);
    }

    fn add_species(
        &mut self,
        rel: &str,
        header: records::SpeciesHeader,
        sessions: Vec<records::SessionRecord>,
    ) {
        let taxon = match (&header.genus, &header.species) {
            (Some(genus), Some(epithet)) => Some((genus.as_str(), epithet.as_str())),
            _ => None,
        };
        let slug = self.allocate(taxon, rel);
        let group_path = rel.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
        tracing::debug!(path = rel, %slug, "species");
        self.catalog.species.push(Species::from_header(
            rel.to_string(),
            group_path.to_string(),
            slug,
            header,
            sessions,
        ));
    }

    /// Compute and register a slug. A collision is reported and the
    /// computed slug is kept unregistered.
    fn allocate(&mut self, taxon: Option<(&str, &str)>, rel: &str) -> String {
        let slug = naming::entity_slug(taxon, rel);
        if !self.registry.claim(&slug) {
            self.diags.error(rel, format!("duplicated name: {slug}"));
        }
        slug
    }
}

fn collect_entries(path: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        entries.push(Entry {
            is_dir: path.is_dir(),
            name,
            path,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn join(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{find_group, find_species, write_index};
    use tempfile::TempDir;

    fn run(root: &Path) -> (Catalog, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut registry = SlugRegistry::new();
        let catalog = ingest(root, &SiteConfig::default(), &mut registry, &mut diags).unwrap();
        (catalog, diags)
    }

    #[test]
    fn reads_groups_and_species() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "plants/blue", "group_title: Blue flowers\n");
        write_index(
            tmp.path(),
            "plants/blue/viola",
            "genus: Viola\nspecies: odorata\n---\nimages: [1.jpg, 2.jpg]\n",
        );

        let (catalog, diags) = run(tmp.path());
        assert!(diags.is_empty(), "{diags:?}");
        let group = find_group(&catalog, "plants/blue");
        assert_eq!(group.title, "Blue flowers");
        assert_eq!(group.slug, "plants-blue");

        let species = find_species(&catalog, "viola-odorata");
        assert_eq!(species.path, "plants/blue/viola");
        assert_eq!(species.group_path, "plants/blue");
        assert_eq!(species.sessions[0].images, vec!["1.jpg", "2.jpg"]);
    }

    #[test]
    fn index_file_matched_ignoring_case() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "a", "group_title: A\n");
        fs::rename(tmp.path().join("a/index.txt"), tmp.path().join("a/INDEX.TXT")).unwrap();

        let (catalog, _) = run(tmp.path());
        assert_eq!(catalog.groups.len(), 1);
    }

    #[test]
    fn listdir_children_visited_first() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "", "listdir: [c, a]\n");
        for name in ["a", "b", "c"] {
            write_index(tmp.path(), name, &format!("group_title: {name}\n"));
        }

        let (catalog, diags) = run(tmp.path());
        assert!(diags.is_empty(), "{diags:?}");
        let order: Vec<&str> = catalog.groups.iter().map(|g| g.path.as_str()).collect();
        assert_eq!(order, vec!["", "c", "a", "b"]);
    }

    #[test]
    fn missing_listed_child_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "", "listdir: [gone, a]\n");
        write_index(tmp.path(), "a", "group_title: A\n");

        let (catalog, diags) = run(tmp.path());
        assert_eq!(catalog.groups.len(), 2);
        let errors: Vec<_> = diags.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "gone");
    }

    #[test]
    fn static_and_hidden_dirs_skipped() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "static", "group_title: Static\n");
        write_index(tmp.path(), ".git", "group_title: Hidden\n");
        write_index(tmp.path(), "a", "group_title: A\n");

        let (catalog, _) = run(tmp.path());
        let paths: Vec<&str> = catalog.groups.iter().map(|g| g.path.as_str()).collect();
        assert_eq!(paths, vec!["a"]);
    }

    #[test]
    fn nested_static_dir_is_traversed() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "a/static", "group_title: Nested\n");

        let (catalog, _) = run(tmp.path());
        assert_eq!(catalog.groups[0].path, "a/static");
    }

    #[test]
    fn unknown_header_is_reported_and_skipped() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "a", "title: nope\n");
        write_index(tmp.path(), "a/b", "group_title: B\n");

        let (catalog, diags) = run(tmp.path());
        assert_eq!(catalog.groups.len(), 1);
        assert_eq!(diags.errors().next().unwrap().path, "a");
        assert_eq!(catalog.groups[0].parent, None);
    }

    #[test]
    fn unparseable_document_below_root_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "a", "genus: [unclosed\n");
        write_index(tmp.path(), "a/b", "group_title: B\n");

        let (catalog, diags) = run(tmp.path());
        assert_eq!(catalog.groups.len(), 1);
        assert_eq!(diags.errors().count(), 1);
    }

    #[test]
    fn unparseable_root_document_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "", "genus: [unclosed\n");

        let mut diags = Diagnostics::new();
        let mut registry = SlugRegistry::new();
        let result = ingest(tmp.path(), &SiteConfig::default(), &mut registry, &mut diags);
        assert!(matches!(result, Err(IngestError::Parse { .. })));
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut diags = Diagnostics::new();
        let mut registry = SlugRegistry::new();
        let result = ingest(
            &tmp.path().join("nope"),
            &SiteConfig::default(),
            &mut registry,
            &mut diags,
        );
        assert!(matches!(result, Err(IngestError::SourceUnreadable { .. })));
    }

    #[test]
    fn duplicate_slug_keeps_first_and_reports() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "a", "group_title: A\n");
        write_index(tmp.path(), "a/x", "genus: Viola\nspecies: odorata\n");
        write_index(tmp.path(), "a/y", "genus: Viola\nspecies: odorata\n");

        let (catalog, diags) = run(tmp.path());
        assert_eq!(catalog.species.len(), 2);
        assert_eq!(catalog.species[0].slug, "viola-odorata");
        assert_eq!(catalog.species[1].slug, "viola-odorata");
        let errors: Vec<_> = diags.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "a/y");
    }

    #[test]
    fn group_records_parent_and_fallback_title() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "plants", "group_title: Plants\n");
        write_index(tmp.path(), "plants/010-Blue-flowers", "listdir: []\n");

        let (catalog, _) = run(tmp.path());
        let group = find_group(&catalog, "plants/010-Blue-flowers");
        assert_eq!(group.title, "Blue flowers");
        assert_eq!(group.parent.as_deref(), Some("plants"));
    }

    #[test]
    fn species_without_taxon_uses_path_slug() {
        let tmp = TempDir::new().unwrap();
        write_index(tmp.path(), "a", "group_title: A\n");
        write_index(tmp.path(), "a/Unknown Bee", "species:\n");

        let (catalog, _) = run(tmp.path());
        assert_eq!(catalog.species[0].slug, "a-unknown-bee");
    }
}
