use std::fmt;

use serde_json::Value;

/// One step in the path from the tree root to a difference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, ".{}", key),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Removed,
    Edited,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Edited => "edited",
        };
        f.write_str(s)
    }
}

/// A single difference between two JSON-like trees
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: Vec<PathSegment>,
    pub kind: DiffKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl DiffEntry {
    fn path_string(&self) -> String {
        self.path.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path_string();
        match self.kind {
            DiffKind::Added => write!(
                f,
                "added   {} {}",
                path,
                self.new.as_ref().unwrap_or(&Value::Null)
            ),
            DiffKind::Removed => write!(
                f,
                "removed {} {}",
                path,
                self.old.as_ref().unwrap_or(&Value::Null)
            ),
            DiffKind::Edited => write!(
                f,
                "edited  {} {} --> {}",
                path,
                self.old.as_ref().unwrap_or(&Value::Null),
                self.new.as_ref().unwrap_or(&Value::Null)
            ),
        }
    }
}

/// Compare two JSON-like trees and return every difference.
///
/// Sequences are compared index by index, so callers diffing keyed lists
/// must pre-sort both sides by the same key. Records are compared over the
/// union of their keys, except that two records with different `name`
/// values are reported as one removal plus one addition. Scalars compare
/// with type normalization, see [`scalars_equal`].
pub fn diff(old: &Value, new: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    walk(&mut Vec::new(), Some(old), Some(new), &mut entries);
    entries
}

fn walk(
    path: &mut Vec<PathSegment>,
    old: Option<&Value>,
    new: Option<&Value>,
    entries: &mut Vec<DiffEntry>,
) {
    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => entries.push(DiffEntry {
            path: path.clone(),
            kind: DiffKind::Added,
            old: None,
            new: Some(new.clone()),
        }),
        (Some(old), None) => entries.push(DiffEntry {
            path: path.clone(),
            kind: DiffKind::Removed,
            old: Some(old.clone()),
            new: None,
        }),
        (Some(old), Some(new)) => match (old, new) {
            (Value::Array(old_items), Value::Array(new_items)) => {
                let len = old_items.len().max(new_items.len());
                for index in 0..len {
                    path.push(PathSegment::Index(index));
                    walk(path, old_items.get(index), new_items.get(index), entries);
                    path.pop();
                }
            }
            (Value::Object(old_map), Value::Object(new_map)) => {
                // Records in these trees carry their identity in "name".
                // Two records with different names are different objects,
                // not a pile of field edits of one another.
                if let (Some(old_name), Some(new_name)) = (old_map.get("name"), new_map.get("name"))
                {
                    if !scalars_equal(old_name, new_name) {
                        entries.push(DiffEntry {
                            path: path.clone(),
                            kind: DiffKind::Removed,
                            old: Some(old.clone()),
                            new: None,
                        });
                        entries.push(DiffEntry {
                            path: path.clone(),
                            kind: DiffKind::Added,
                            old: None,
                            new: Some(new.clone()),
                        });
                        return;
                    }
                }
                for (key, new_value) in new_map {
                    path.push(PathSegment::Key(key.clone()));
                    walk(path, old_map.get(key), Some(new_value), entries);
                    path.pop();
                }
                for (key, old_value) in old_map {
                    if !new_map.contains_key(key) {
                        path.push(PathSegment::Key(key.clone()));
                        walk(path, Some(old_value), None, entries);
                        path.pop();
                    }
                }
            }
            _ => {
                if !scalars_equal(old, new) {
                    entries.push(DiffEntry {
                        path: path.clone(),
                        kind: DiffKind::Edited,
                        old: Some(old.clone()),
                        new: Some(new.clone()),
                    });
                }
            }
        },
    }
}

/// Scalar equality with type normalization.
///
/// Historical snapshots of the persisted configuration carry some constants
/// as strings where newer runs produce numbers (and vice versa). Comparing
/// the canonical string forms keeps such pairs from registering as an edit
/// on every single run. Values of the same type compare strictly.
fn scalars_equal(old: &Value, new: &Value) -> bool {
    if old == new {
        return true;
    }
    match (old, new) {
        (Value::Array(_), _)
        | (_, Value::Array(_))
        | (Value::Object(_), _)
        | (_, Value::Object(_)) => false,
        _ => canonical(old) == canonical(new),
    }
}

fn canonical(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
