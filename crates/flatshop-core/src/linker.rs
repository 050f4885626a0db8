//! Relationship list editing
//!
//! A parent links to its children through a field holding their ids,
//! separated by single spaces, in insertion order:
//!
//! ```text
//! website.category = "3 7 9"
//! category.item    = "12 120"
//! item.image       = ""
//! ```
//!
//! Lists are edited as token sequences (split, edit, re-join) rather than
//! by substring surgery, so an id never matches inside a longer id.
//!
//! Parent updates are read-modify-write without a lock: two concurrent
//! edits of the same parent list can lose one update (last writer wins).

use tracing::info;

use crate::record::RecordPath;
use crate::storage::{RecordStore, StorageError, StorageResult};

/// Split a list field into its ids, ignoring stray separators
pub fn tokens(list: &str) -> impl Iterator<Item = &str> {
    list.split(' ').filter(|token| !token.is_empty())
}

/// Append an id to a list
pub fn append_token(list: &str, id: &str) -> String {
    let mut ids: Vec<&str> = tokens(list).collect();
    ids.push(id);
    ids.join(" ")
}

/// Remove the first occurrence of an id from a list
///
/// Returns `None` when the id is not in the list.
pub fn remove_token(list: &str, id: &str) -> Option<String> {
    let mut ids: Vec<&str> = tokens(list).collect();
    let position = ids.iter().position(|token| *token == id)?;
    ids.remove(position);
    Some(ids.join(" "))
}

/// Append `child_id` to the parent's `field` list
///
/// Fails with `MissingField` if the parent has no such field.
pub fn add_child(
    store: &RecordStore,
    parent: &RecordPath,
    field: &str,
    child_id: u64,
) -> StorageResult<()> {
    let mut record = store.read(parent)?;
    let list = append_token(record.require(field, parent)?, &child_id.to_string());
    record.set(field, list);
    store.write(parent, &record)?;

    info!(parent = %parent, field, child_id, "linked child");
    Ok(())
}

/// Remove the first `child_id` token from the parent's `field` list
///
/// Fails with `MissingField` if the parent has no such field and with
/// `TokenNotFound` if the id is not listed; nothing is written in either case.
pub fn remove_child(
    store: &RecordStore,
    parent: &RecordPath,
    field: &str,
    child_id: &str,
) -> StorageResult<()> {
    let mut record = store.read(parent)?;
    let current = record.require(field, parent)?;
    let list = remove_token(current, child_id).ok_or_else(|| StorageError::TokenNotFound {
        path: parent.to_string(),
        field: field.to_string(),
        id: child_id.to_string(),
        list: current.to_string(),
    })?;
    record.set(field, list);
    store.write(parent, &record)?;

    info!(parent = %parent, field, child_id, "unlinked child");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::record::Record;
    use std::fs;
    use tempfile::TempDir;

    fn store_with_parent(temp: &TempDir, fields: &[(&str, &str)]) -> (RecordStore, RecordPath) {
        let store = RecordStore::open(&Config::rooted_at(temp.path()));
        let parent = RecordPath::website();
        let record: Record = fields.iter().copied().collect();
        store.write(&parent, &record).unwrap();
        (store, parent)
    }

    #[test]
    fn test_append_to_empty_list() {
        assert_eq!(append_token("", "5"), "5");
        assert_eq!(append_token("3", "5"), "3 5");
    }

    #[test]
    fn test_remove_respects_token_boundaries() {
        assert_eq!(remove_token("12 120 7", "12").as_deref(), Some("120 7"));
        assert_eq!(remove_token("120 7 12", "12").as_deref(), Some("120 7"));
        assert_eq!(remove_token("120 112", "12"), None);
        assert_eq!(remove_token("", "12"), None);
    }

    #[test]
    fn test_remove_only_first_duplicate() {
        assert_eq!(remove_token("4 8 4", "4").as_deref(), Some("8 4"));
    }

    #[test]
    fn test_remove_last_and_middle_tokens_leave_clean_separators() {
        assert_eq!(remove_token("3 7 9", "9").as_deref(), Some("3 7"));
        assert_eq!(remove_token("3 7 9", "7").as_deref(), Some("3 9"));
        assert_eq!(remove_token("3", "3").as_deref(), Some(""));
    }

    #[test]
    fn test_stray_separators_are_normalized() {
        assert_eq!(append_token(" 3  7 ", "9"), "3 7 9");
        assert_eq!(remove_token("3  7 ", "3").as_deref(), Some("7"));
    }

    #[test]
    fn test_add_remove_round_trip() {
        let temp = TempDir::new().unwrap();
        let (store, parent) = store_with_parent(&temp, &[("category", "3 7 9")]);

        remove_child(&store, &parent, "category", "7").unwrap();
        assert_eq!(store.read(&parent).unwrap().get("category"), Some("3 9"));

        add_child(&store, &parent, "category", 7).unwrap();
        assert_eq!(store.read(&parent).unwrap().get("category"), Some("3 9 7"));
    }

    #[test]
    fn test_add_child_to_empty_field() {
        let temp = TempDir::new().unwrap();
        let (store, parent) = store_with_parent(&temp, &[("category", "")]);

        add_child(&store, &parent, "category", 5).unwrap();
        assert_eq!(store.read(&parent).unwrap().get("category"), Some("5"));
    }

    #[test]
    fn test_remove_child_token_boundary() {
        let temp = TempDir::new().unwrap();
        let (store, parent) = store_with_parent(&temp, &[("category", "12 120 7")]);

        remove_child(&store, &parent, "category", "12").unwrap();
        assert_eq!(store.read(&parent).unwrap().get("category"), Some("120 7"));
    }

    #[test]
    fn test_missing_field_is_fatal_and_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let (store, parent) = store_with_parent(&temp, &[("cart.shipping", "500")]);
        let before = fs::read(store.file_path(&parent)).unwrap();

        let err = remove_child(&store, &parent, "category", "3").unwrap_err();
        assert!(matches!(err, StorageError::MissingField { ref field, .. } if field == "category"));

        let err = add_child(&store, &parent, "category", 3).unwrap_err();
        assert!(matches!(err, StorageError::MissingField { .. }));

        assert_eq!(fs::read(store.file_path(&parent)).unwrap(), before);
    }

    #[test]
    fn test_remove_absent_child() {
        let temp = TempDir::new().unwrap();
        let (store, parent) = store_with_parent(&temp, &[("category", "120 7")]);

        let err = remove_child(&store, &parent, "category", "12").unwrap_err();
        assert!(matches!(err, StorageError::TokenNotFound { .. }));
        assert!(err.is_not_found());
        assert_eq!(store.read(&parent).unwrap().get("category"), Some("120 7"));
    }

    #[test]
    fn test_missing_parent() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::open(&Config::rooted_at(temp.path()));
        let parent = RecordPath::entity("category", "9").unwrap();

        let err = add_child(&store, &parent, "item", 1).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
