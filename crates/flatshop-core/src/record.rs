//! Records and record paths
//!
//! A record is a flat mapping of field name to string value, one file per
//! entity. Relationship lists are ordinary fields whose value is a
//! space-separated list of child ids (see [`crate::linker`]).
//!
//! On disk a record is a TOML table of strings:
//!
//! ```toml
//! image = "41 57"
//! "item.name" = "Blue mug"
//! "item.price" = "1200"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::storage::{StorageError, StorageResult};

/// Name of the singleton root record
pub const WEBSITE: &str = "website";

/// A persisted mapping of field name to string value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Get a field the caller's schema expects to be present
    pub fn require(&self, key: &str, path: &RecordPath) -> StorageResult<&str> {
        self.get(key).ok_or_else(|| StorageError::MissingField {
            path: path.to_string(),
            field: key.to_string(),
        })
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Set a field only if it is not already present
    pub fn set_default(&mut self, key: &str, value: &str) {
        self.fields
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the on-disk representation
    ///
    /// Fails with a description of the problem when the text is not a table
    /// of string values.
    pub fn parse(text: &str) -> Result<Self, String> {
        let fields: BTreeMap<String, String> = toml::from_str(text).map_err(|e| e.to_string())?;
        Ok(Self { fields })
    }

    /// Serialize to the on-disk representation
    pub fn to_text(&self) -> Result<String, String> {
        toml::to_string(&self.fields).map_err(|e| e.to_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Location of a record relative to the `db/` root
///
/// `<table>/<id>` for catalog entities, `website` for the root record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPath {
    table: String,
    id: Option<String>,
}

impl RecordPath {
    /// The singleton website record
    pub fn website() -> Self {
        Self {
            table: WEBSITE.to_string(),
            id: None,
        }
    }

    /// Path of an entity from an untrusted id (URL segment, list token)
    ///
    /// The id must be a plain decimal integer, which also keeps it from
    /// naming anything outside its table directory.
    pub fn entity(table: &str, id: &str) -> StorageResult<Self> {
        validate_table(table)?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StorageError::InvalidId {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        Ok(Self {
            table: table.to_string(),
            id: Some(id.to_string()),
        })
    }

    /// Path of an entity from an id the store assigned
    pub fn from_id(table: &str, id: u64) -> StorageResult<Self> {
        validate_table(table)?;
        Ok(Self {
            table: table.to_string(),
            id: Some(id.to_string()),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The final path segment: the entity id, or `None` for the website record
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Relative filesystem path under the db root
    pub fn relative(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.table);
        if let Some(id) = &self.id {
            path.push(id);
        }
        path
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.table, id),
            None => write!(f, "{}", self.table),
        }
    }
}

fn validate_table(table: &str) -> StorageResult<()> {
    let valid = !table.is_empty()
        && table
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidTable(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut record = Record::new();
        assert!(record.get("item.name").is_none());

        record.set("item.name", "Mug");
        record.set("item.name", "Blue mug");
        assert_eq!(record.get("item.name"), Some("Blue mug"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut record: Record = [("image", "4 8")].into_iter().collect();
        record.set_default("image", "");
        record.set_default("item.price", "0");

        assert_eq!(record.get("image"), Some("4 8"));
        assert_eq!(record.get("item.price"), Some("0"));
    }

    #[test]
    fn test_text_round_trip() {
        let record: Record = [
            ("category.name", "Kitchen & \"Table\""),
            ("item", ""),
            ("notes", "line one\nline two"),
        ]
        .into_iter()
        .collect();

        let text = record.to_text().unwrap();
        assert_eq!(Record::parse(&text).unwrap(), record);
    }

    #[test]
    fn test_parse_rejects_non_string_values() {
        assert!(Record::parse("price = 12").is_err());
        assert!(Record::parse("not toml at all").is_err());
    }

    #[test]
    fn test_require_missing_field() {
        let record = Record::new();
        let path = RecordPath::website();
        let err = record.require("category", &path).unwrap_err();
        assert!(matches!(err, StorageError::MissingField { ref field, .. } if field == "category"));
    }

    #[test]
    fn test_entity_path() {
        let path = RecordPath::entity("item", "42").unwrap();
        assert_eq!(path.to_string(), "item/42");
        assert_eq!(path.id(), Some("42"));
        assert_eq!(path.relative(), PathBuf::from("item").join("42"));

        assert_eq!(RecordPath::website().to_string(), "website");
        assert_eq!(RecordPath::website().id(), None);
    }

    #[test]
    fn test_entity_rejects_unsafe_ids() {
        for id in ["..", "", "12a", "-3", "4 5", "a/b"] {
            assert!(
                matches!(RecordPath::entity("item", id), Err(StorageError::InvalidId { .. })),
                "accepted {:?}",
                id
            );
        }
        assert!(matches!(
            RecordPath::entity("../etc", "1"),
            Err(StorageError::InvalidTable(_))
        ));
    }
}
