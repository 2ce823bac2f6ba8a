//! Typed wire records for index documents.
//!
//! Every directory may hold one index document: a YAML stream whose first
//! block is a header and whose remaining blocks are photo sessions.
//!
//! ```yaml
//! genus: Viola
//! species: odorata
//! family: Violaceae
//! genus_de: Veilchen
//! species_de: März-
//! thumb: 2.jpg
//! ---
//! images: [1.jpg, 2.jpg]
//! date: "3.2019"
//! location: Hainburg
//! ```
//!
//! The header shape decides the entity kind: a `species` key makes a
//! [`SpeciesHeader`], a `group_title` or `listdir` key makes a
//! [`GroupHeader`]. Anything else is rejected with
//! [`RecordError::UnknownType`].
//!
//! Hand-written YAML is loose about types, so scalars are read leniently:
//! numbers and booleans are accepted wherever text is expected, and
//! vernacular names may be a single string or a list. Both ambiguities are
//! resolved here so nothing downstream sees them.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown type of register")]
    UnknownType,
}

/// Header of a group directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroupHeader {
    #[serde(default, alias = "group_name", deserialize_with = "lenient_text")]
    pub group_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub group_template: Option<String>,
    /// Child directory names to visit first, in this order.
    #[serde(default, deserialize_with = "lenient_list")]
    pub listdir: Option<Vec<String>>,
    /// Path of the group that should follow this one in navigation.
    #[serde(default, deserialize_with = "lenient_text")]
    pub next_group: Option<String>,
}

/// Header of a species directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpeciesHeader {
    #[serde(default, deserialize_with = "lenient_text")]
    pub genus: Option<String>,
    /// Species epithet. The key itself marks the document as a species.
    #[serde(default, deserialize_with = "lenient_text")]
    pub species: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub family: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub order: Option<String>,
    #[serde(default, alias = "genus_de", deserialize_with = "lenient_list")]
    pub vernacular_genus: Option<Vec<String>>,
    #[serde(default, alias = "species_de", deserialize_with = "lenient_list")]
    pub vernacular_species: Option<Vec<String>>,
    #[serde(default, alias = "family_de", deserialize_with = "lenient_text")]
    pub vernacular_family: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumb: Option<String>,
    /// Index-membership tag.
    #[serde(default, alias = "makeindex", deserialize_with = "lenient_text")]
    pub index_tag: Option<String>,
}

/// One photo session block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionRecord {
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Group(GroupHeader),
    Species(SpeciesHeader),
}

/// A parsed index document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub header: Header,
    /// Session blocks; only ever non-empty for species headers.
    pub sessions: Vec<SessionRecord>,
}

/// Parse the text of an index document.
///
/// A leading byte-order mark is ignored. Empty trailing blocks (a stray
/// `---` at the end of the file) are dropped.
pub fn parse_document(text: &str) -> Result<Document, RecordError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut blocks = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        blocks.push(Value::deserialize(doc)?);
    }

    let mut blocks = blocks.into_iter();
    let first = blocks.next().ok_or(RecordError::UnknownType)?;
    let header = classify(first)?;

    let sessions = match header {
        Header::Species(_) => blocks
            .filter(|b| !b.is_null())
            .map(serde_yaml::from_value)
            .collect::<Result<Vec<SessionRecord>, _>>()?,
        Header::Group(_) => Vec::new(),
    };

    Ok(Document { header, sessions })
}

fn classify(block: Value) -> Result<Header, RecordError> {
    let Value::Mapping(map) = &block else {
        return Err(RecordError::UnknownType);
    };
    if map.contains_key("species") {
        Ok(Header::Species(serde_yaml::from_value(block)?))
    } else if ["group_title", "group_name", "listdir"]
        .iter()
        .any(|k| map.contains_key(*k))
    {
        Ok(Header::Group(serde_yaml::from_value(block)?))
    } else {
        Err(RecordError::UnknownType)
    }
}

/// Text form of a scalar; `None` for null, error for collections.
fn scalar_text(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => Err("expected a text value".to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_text(value).map_err(serde::de::Error::custom)
}

/// Accepts a single scalar or a list of scalars. Null list entries become
/// empty strings so positional pairing (vernacular genus/species) survives.
fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| scalar_text(item).map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        other => scalar_text(other)
            .map(|text| text.map(|t| vec![t]))
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_header_with_sessions() {
        let doc = parse_document(
            "genus: Viola\nspecies: odorata\n---\nimages: [1.jpg, 2.jpg]\ndate: '3.2019'\n---\nimages:\n  - 3.jpg\n",
        )
        .unwrap();

        let Header::Species(header) = doc.header else {
            panic!("expected species header");
        };
        assert_eq!(header.genus.as_deref(), Some("Viola"));
        assert_eq!(header.species.as_deref(), Some("odorata"));
        assert_eq!(doc.sessions.len(), 2);
        assert_eq!(
            doc.sessions[0].images,
            Some(vec!["1.jpg".to_string(), "2.jpg".to_string()])
        );
        assert_eq!(doc.sessions[0].date.as_deref(), Some("3.2019"));
        assert_eq!(doc.sessions[1].images, Some(vec!["3.jpg".to_string()]));
    }

    #[test]
    fn group_header_by_title() {
        let doc = parse_document("group_title: Blue flowers\nnext_group: x/c\n").unwrap();
        assert_eq!(
            doc.header,
            Header::Group(GroupHeader {
                group_title: Some("Blue flowers".to_string()),
                next_group: Some("x/c".to_string()),
                ..Default::default()
            })
        );
        assert!(doc.sessions.is_empty());
    }

    #[test]
    fn group_header_by_listdir_only() {
        let doc = parse_document("listdir: [b, a]\n").unwrap();
        let Header::Group(header) = doc.header else {
            panic!("expected group header");
        };
        assert_eq!(header.group_title, None);
        assert_eq!(header.listdir, Some(vec!["b".to_string(), "a".to_string()]));
    }

    #[test]
    fn group_name_is_accepted_as_title() {
        let doc = parse_document("group_name: Old style\n").unwrap();
        let Header::Group(header) = doc.header else {
            panic!("expected group header");
        };
        assert_eq!(header.group_title.as_deref(), Some("Old style"));
    }

    #[test]
    fn unknown_header_rejected() {
        let result = parse_document("title: Something\n");
        assert!(matches!(result, Err(RecordError::UnknownType)));
    }

    #[test]
    fn scalar_header_rejected() {
        let result = parse_document("just some text\n");
        assert!(matches!(result, Err(RecordError::UnknownType)));
    }

    #[test]
    fn empty_document_rejected() {
        assert!(matches!(parse_document(""), Err(RecordError::UnknownType)));
    }

    #[test]
    fn invalid_yaml_is_error() {
        let result = parse_document("genus: [unclosed\n");
        assert!(matches!(result, Err(RecordError::Yaml(_))));
    }

    #[test]
    fn vernacular_scalar_becomes_list() {
        let doc = parse_document("species: odorata\ngenus_de: Veilchen\nspecies_de: [März-, Duft-]\n").unwrap();
        let Header::Species(header) = doc.header else {
            panic!("expected species header");
        };
        assert_eq!(header.vernacular_genus, Some(vec!["Veilchen".to_string()]));
        assert_eq!(
            header.vernacular_species,
            Some(vec!["März-".to_string(), "Duft-".to_string()])
        );
    }

    #[test]
    fn numbers_read_as_text() {
        let doc = parse_document("species: 1\n---\nimages: [12, 13.jpg]\ndate: 5.2019\n").unwrap();
        let Header::Species(header) = doc.header else {
            panic!("expected species header");
        };
        assert_eq!(header.species.as_deref(), Some("1"));
        assert_eq!(
            doc.sessions[0].images,
            Some(vec!["12".to_string(), "13.jpg".to_string()])
        );
        assert_eq!(doc.sessions[0].date.as_deref(), Some("5.2019"));
    }

    #[test]
    fn makeindex_and_family_de_aliases() {
        let doc = parse_document("species: x\nmakeindex: Animalia\nfamily_de: Veilchengewächse\n").unwrap();
        let Header::Species(header) = doc.header else {
            panic!("expected species header");
        };
        assert_eq!(header.index_tag.as_deref(), Some("Animalia"));
        assert_eq!(header.vernacular_family.as_deref(), Some("Veilchengewächse"));
    }

    #[test]
    fn byte_order_mark_ignored() {
        let doc = parse_document("\u{feff}group_title: A\n").unwrap();
        assert!(matches!(doc.header, Header::Group(_)));
    }

    #[test]
    fn trailing_empty_block_dropped() {
        let doc = parse_document("species: odorata\n---\nimages: [1.jpg]\n---\n").unwrap();
        assert_eq!(doc.sessions.len(), 1);
    }

    #[test]
    fn null_species_value_still_marks_species() {
        let doc = parse_document("species:\ngenus: Viola\n").unwrap();
        let Header::Species(header) = doc.header else {
            panic!("expected species header");
        };
        assert_eq!(header.species, None);
    }
}
