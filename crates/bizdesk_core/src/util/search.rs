//! Recursive search through nested JSON arrays and objects.

use serde_json::Value;
use std::fmt::{Display, Formatter};

/// One step of a path into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Key(key) => write!(f, ".{key}"),
        }
    }
}

/// Depth-first search for `needle`, returning the path of the first match.
///
/// Arrays are walked in index order and objects in key order. A scalar
/// match at the root returns an empty path. String comparison is exact.
pub fn search_recursive(haystack: &Value, needle: &Value) -> Option<Vec<PathSegment>> {
    let mut path = Vec::new();
    if walk(haystack, needle, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn walk(current: &Value, needle: &Value, path: &mut Vec<PathSegment>) -> bool {
    if current == needle {
        return true;
    }
    match current {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                if walk(item, needle, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        Value::Object(map) => {
            for (key, item) in map {
                path.push(PathSegment::Key(key.clone()));
                if walk(item, needle, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{search_recursive, PathSegment};
    use serde_json::json;

    #[test]
    fn finds_nested_array_value() {
        let haystack = json!([["a", "b"], ["c", ["d", "target"]]]);
        let path = search_recursive(&haystack, &json!("target")).unwrap();
        assert_eq!(
            path,
            vec![
                PathSegment::Index(1),
                PathSegment::Index(1),
                PathSegment::Index(1)
            ]
        );
    }

    #[test]
    fn walks_objects_by_key() {
        let haystack = json!({"events": ["login", "training_completed"]});
        let path = search_recursive(&haystack, &json!("training_completed")).unwrap();
        let rendered: String = path.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ".events[1]");
    }

    #[test]
    fn missing_value_returns_none() {
        let haystack = json!([1, [2, [3]]]);
        assert!(search_recursive(&haystack, &json!(4)).is_none());
        assert_eq!(search_recursive(&json!(4), &json!(4)), Some(Vec::new()));
    }
}
