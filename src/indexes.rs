//! Secondary indexes.
//!
//! An index partitions the linked species under string keys for alternate
//! browsing orders: by genus initial, by family, by observation date and so
//! on. Each species may produce several keys (one per vernacular name, one
//! per session location), so key extraction returns a list.
//!
//! ```text
//! index-vernacular-genus (length 1, vernacular sort)
//!   "V" → [Veilchen (Viola odorata), Vergissmeinnicht (Myosotis arvensis)]
//!   "W" → [Wiesensalbei (Salvia pratensis)]
//! ```
//!
//! Keys sort ordinally. Buckets sort either taxonomically by
//! `(genus, species)` or by vernacular display name. Indexes are derived on
//! every run and never persisted.

use crate::config::IndexConfig;
use crate::diagnostics::Diagnostics;
use crate::types::{Catalog, Species, SpeciesId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Species field(s) an index is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKey {
    Genus,
    Family,
    Order,
    VernacularFamily,
    /// Every paired vernacular display name.
    VernacularName,
    /// Every session location.
    Location,
    /// Every session date as `YYYY.MM`.
    Date,
}

/// Order of species within a key bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSort {
    /// By `(genus, species)`.
    #[default]
    Taxonomic,
    /// By vernacular display names.
    Vernacular,
}

/// Which species an index admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// Species without a `makeindex` tag.
    Untagged,
    /// Species whose `makeindex` tag equals this value.
    Tagged(String),
}

impl Membership {
    pub fn admits(&self, species: &Species) -> bool {
        match self {
            Membership::Untagged => species.index_tag.is_none(),
            Membership::Tagged(tag) => species.index_tag.as_deref() == Some(tag.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Truncate keys to this many characters.
    pub length: Option<usize>,
    pub sort: IndexSort,
    pub membership: Membership,
}

impl From<&IndexConfig> for IndexOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            length: config.length,
            sort: config.sort,
            membership: match &config.tag {
                Some(tag) => Membership::Tagged(tag.clone()),
                None => Membership::Untagged,
            },
        }
    }
}

/// A keyed partition of the species set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: String,
    /// Keys in ascending ordinal order.
    pub keys: Vec<String>,
    /// Sorted species per key.
    pub entries: BTreeMap<String, Vec<SpeciesId>>,
}

impl Index {
    pub fn species_for(&self, key: &str) -> &[SpeciesId] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Build an index with a custom key extractor and bucket ordering.
///
/// Only species attached to a surviving group are considered. Empty keys are
/// skipped; a species lands in a bucket at most once.
pub fn build_index_by<K, C>(
    name: &str,
    catalog: &Catalog,
    length: Option<usize>,
    membership: &Membership,
    mut extract: K,
    compare: C,
) -> Index
where
    K: FnMut(&Species) -> Vec<String>,
    C: Fn(&Species, &Species) -> Ordering,
{
    let mut entries: BTreeMap<String, Vec<SpeciesId>> = BTreeMap::new();
    for id in catalog.linked_species() {
        let species = &catalog[id];
        if !membership.admits(species) {
            continue;
        }
        for key in extract(species) {
            if key.is_empty() {
                continue;
            }
            let key = truncate(&key, length);
            let bucket = entries.entry(key).or_default();
            if !bucket.contains(&id) {
                bucket.push(id);
            }
        }
    }

    for bucket in entries.values_mut() {
        bucket.sort_by(|&a, &b| {
            compare(&catalog[a], &catalog[b]).then_with(|| catalog[a].slug.cmp(&catalog[b].slug))
        });
    }

    Index {
        name: name.to_string(),
        keys: entries.keys().cloned().collect(),
        entries,
    }
}

/// Build an index with one of the stock bucket orderings.
pub fn build_index<K>(name: &str, catalog: &Catalog, options: &IndexOptions, extract: K) -> Index
where
    K: FnMut(&Species) -> Vec<String>,
{
    let compare: fn(&Species, &Species) -> Ordering = match options.sort {
        IndexSort::Taxonomic => taxonomic_order,
        IndexSort::Vernacular => vernacular_order,
    };
    build_index_by(name, catalog, options.length, &options.membership, extract, compare)
}

/// Build one configured index. Malformed dates are reported.
pub fn build_configured(catalog: &Catalog, config: &IndexConfig, diags: &mut Diagnostics) -> Index {
    let options = IndexOptions::from(config);
    let index = build_index(&config.name, catalog, &options, |species| {
        extract_keys(config.key, species, diags)
    });
    tracing::debug!(name = %index.name, keys = index.len(), "built index");
    index
}

/// Build every configured index, in configuration order.
pub fn build_all(catalog: &Catalog, configs: &[IndexConfig], diags: &mut Diagnostics) -> Vec<Index> {
    configs
        .iter()
        .map(|config| build_configured(catalog, config, diags))
        .collect()
}

/// Keys a species contributes under `key`.
pub fn extract_keys(key: IndexKey, species: &Species, diags: &mut Diagnostics) -> Vec<String> {
    match key {
        IndexKey::Genus => vec![species.genus.clone()],
        IndexKey::Family => vec![species.family.clone()],
        IndexKey::Order => vec![species.order.clone()],
        IndexKey::VernacularFamily => vec![species.vernacular_family.clone()],
        IndexKey::VernacularName => species.vernacular_names(),
        IndexKey::Location => species
            .sessions
            .iter()
            .filter_map(|s| s.location.clone())
            .collect(),
        IndexKey::Date => species
            .sessions
            .iter()
            .filter_map(|s| s.date.as_deref())
            .map(|date| {
                date_key(date).unwrap_or_else(|| {
                    diags.warning(&species.path, format!("malformed date: {date}"));
                    let first = date.split('.').next().unwrap_or_default();
                    format!("{first}.")
                })
            })
            .collect(),
    }
}

/// `"3.2019"` → `"2019.03"`. `None` when the date is not `month.year`.
pub fn date_key(date: &str) -> Option<String> {
    let (month, year) = date.split_once('.')?;
    if year.contains('.') || year.is_empty() {
        return None;
    }
    let month: u32 = month.trim().parse().ok()?;
    Some(format!("{}.{month:02}", year.trim()))
}

pub fn taxonomic_order(a: &Species, b: &Species) -> Ordering {
    (&a.genus, &a.species).cmp(&(&b.genus, &b.species))
}

pub fn vernacular_order(a: &Species, b: &Species) -> Ordering {
    a.vernacular_names().cmp(&b.vernacular_names())
}

fn truncate(key: &str, length: Option<usize>) -> String {
    match length {
        Some(n) => key.chars().take(n).collect(),
        None => key.to_string(),
    }
}
