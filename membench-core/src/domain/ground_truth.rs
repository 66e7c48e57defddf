use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::keys;

/// Target location for line-range code-retrieval tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeLocation {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// The three ground-truth shapes carried by code-retrieval items.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundTruth {
    Location(CodeLocation),
    Snippets(Vec<String>),
    Files(Vec<String>),
}

impl GroundTruth {
    /// Target location from `metadata.groundTruth`, when present and
    /// well-formed.
    pub fn location(metadata: &HashMap<String, Value>) -> Option<CodeLocation> {
        let value = metadata.get(keys::GROUND_TRUTH)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Gold snippets from `metadata.goldSnippets`.
    pub fn snippets(metadata: &HashMap<String, Value>) -> Vec<String> {
        string_array(metadata.get(keys::GOLD_SNIPPETS))
    }

    /// Dependency files from `metadata.dependencyFiles`.
    pub fn dependency_files(metadata: &HashMap<String, Value>) -> Vec<String> {
        string_array(metadata.get(keys::DEPENDENCY_FILES))
    }

    /// Modified files from `metadata.modifiedFiles`, falling back to
    /// `metadata.groundTruthFiles`.
    pub fn modified_files(metadata: &HashMap<String, Value>) -> Vec<String> {
        let primary = string_array(metadata.get(keys::MODIFIED_FILES));
        if primary.is_empty() {
            string_array(metadata.get(keys::GROUND_TRUTH_FILES))
        } else {
            primary
        }
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn location_parses_camel_case() {
        let mut metadata = HashMap::new();
        metadata.insert(
            keys::GROUND_TRUTH.to_string(),
            json!({"file": "src/auth.py", "startLine": 10, "endLine": 20}),
        );
        let location = GroundTruth::location(&metadata).unwrap();
        assert_eq!(location.file, "src/auth.py");
        assert_eq!(location.start_line, 10);
        assert_eq!(location.end_line, 20);
    }

    #[test]
    fn location_absent_or_malformed_is_none() {
        assert!(GroundTruth::location(&HashMap::new()).is_none());

        let mut metadata = HashMap::new();
        metadata.insert(keys::GROUND_TRUTH.to_string(), json!({"file": "a.py"}));
        assert!(GroundTruth::location(&metadata).is_none());
    }

    #[test]
    fn modified_files_falls_back() {
        let mut metadata = HashMap::new();
        metadata.insert(keys::GROUND_TRUTH_FILES.to_string(), json!(["x.py"]));
        assert_eq!(GroundTruth::modified_files(&metadata), vec!["x.py"]);

        metadata.insert(keys::MODIFIED_FILES.to_string(), json!(["y.py"]));
        assert_eq!(GroundTruth::modified_files(&metadata), vec!["y.py"]);
    }
}
