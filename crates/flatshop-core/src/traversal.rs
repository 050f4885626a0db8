//! Hierarchical traversal
//!
//! Walks the children a parent references through one of its list fields.
//! The field name doubles as the child table, so `category = "3 7"` on the
//! website record visits `category/3` then `category/7`.
//!
//! The same walk serves rendering nested lists, counting cart lines and
//! checking that a list field exists; per-walk state (running totals,
//! "first child" flags) lives in the visitor closure.

use crate::linker::tokens;
use crate::record::{Record, RecordPath};
use crate::storage::StorageResult;

/// What a visitor wants the traversal to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visit the next sibling
    Continue,
    /// Skip the remaining siblings
    Stop,
}

/// Visit each child referenced by `parent[field]` in list order
///
/// Returns how many children were visited before a visitor answered
/// [`Flow::Stop`]; the child that stopped the walk is not counted. A
/// missing field is a `MissingField` error, a malformed id an `InvalidId`
/// error, and any visitor error ends the walk and is returned as is.
pub fn for_each_child<F, E>(parent: &Record, field: &str, mut visit: F) -> Result<usize, E>
where
    F: FnMut(&RecordPath) -> Result<Flow, E>,
    E: From<crate::storage::StorageError>,
{
    let list = parent
        .get(field)
        .ok_or_else(|| crate::storage::StorageError::MissingField {
            path: describe(parent),
            field: field.to_string(),
        })?;

    let mut visited = 0;
    for token in tokens(list) {
        let child = RecordPath::entity(field, token)?;
        if visit(&child)? == Flow::Stop {
            break;
        }
        visited += 1;
    }
    Ok(visited)
}

/// Number of children referenced by `parent[field]`
///
/// Also serves as a side-effect-free check that the field exists and every
/// token is a valid id.
pub fn count_children(parent: &Record, field: &str) -> StorageResult<usize> {
    for_each_child(parent, field, |_| Ok(Flow::Continue))
}

/// The record is already loaded, so its path is unknown here; name it by
/// its fields instead.
fn describe(record: &Record) -> String {
    let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
    format!("<record with fields: {}>", keys.join(", "))
}
