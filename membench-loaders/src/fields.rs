//! Dot-path accessors over raw JSON records.

use serde_json::Value;

/// Walks `"a.b.0.c"`-style paths; numeric segments index into arrays.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// String at `path`; numbers and booleans are stringified.
pub fn get_string(value: &Value, path: &str) -> Option<String> {
    match get_path(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn get_array<'a>(value: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
    get_path(value, path)?.as_array()
}

/// First present field among `candidates`, stringified.
pub fn first_string(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|c| get_string(value, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_nested_paths() {
        let record = json!({"a": {"b": [{"c": "deep"}]}});
        assert_eq!(get_string(&record, "a.b.0.c"), Some("deep".to_string()));
        assert_eq!(get_string(&record, "a.b.1.c"), None);
        assert_eq!(get_string(&record, "a.missing"), None);
    }

    #[test]
    fn stringifies_scalars() {
        let record = json!({"n": 7, "f": 1.5, "b": true});
        assert_eq!(get_string(&record, "n"), Some("7".to_string()));
        assert_eq!(get_string(&record, "f"), Some("1.5".to_string()));
        assert_eq!(get_string(&record, "b"), Some("true".to_string()));
    }

    #[test]
    fn first_string_respects_order() {
        let record = json!({"speaker": "Ana", "role": "user"});
        assert_eq!(
            first_string(&record, &["speaker", "role"]),
            Some("Ana".to_string())
        );
        assert_eq!(
            first_string(&record, &["missing", "role"]),
            Some("user".to_string())
        );
    }
}
