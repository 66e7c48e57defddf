use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One ingestible context: a stable id, textual content, and free-form
/// metadata. Loaders must produce item-id-prefixed context ids so that
/// retrieval labels survive across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreparedData {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl PreparedData {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Stable context id: `"{item_id}-{corpus_key}"` when the dataset
    /// carries a native identifier, `"{item_id}-ctx-{index}"` otherwise.
    pub fn context_id(item_id: &str, corpus_key: Option<&str>, index: usize) -> String {
        match corpus_key {
            Some(key) => format!("{item_id}-{key}"),
            None => format!("{item_id}-ctx-{index}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkItem {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub contexts: Vec<PreparedData>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl BenchmarkItem {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            contexts: Vec::new(),
            metadata: HashMap::new(),
            question_type: None,
            category: None,
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<PreparedData>) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_question_type(mut self, question_type: impl Into<String>) -> Self {
        self.question_type = Some(question_type.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Synthesized id for nested-questions datasets.
    pub fn nested_id(parent_id: &str, index: usize) -> String {
        format!("{parent_id}-q{index}")
    }

    /// String values from a metadata array field.
    pub fn metadata_strings(&self, key: &str) -> Vec<String> {
        match self.metadata.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_id_form() {
        assert_eq!(BenchmarkItem::nested_id("conv-12", 0), "conv-12-q0");
        assert_eq!(BenchmarkItem::nested_id("conv-12", 3), "conv-12-q3");
    }

    #[test]
    fn context_id_prefers_corpus_key() {
        assert_eq!(
            PreparedData::context_id("item-1", Some("sess_4"), 9),
            "item-1-sess_4"
        );
        assert_eq!(PreparedData::context_id("item-1", None, 0), "item-1-ctx-0");
    }

    #[test]
    fn metadata_strings_handles_shapes() {
        let item = BenchmarkItem::new("i", "q", "a")
            .with_metadata("files", json!(["a.py", "b.py"]))
            .with_metadata("one", json!("solo"))
            .with_metadata("num", json!(42));
        assert_eq!(item.metadata_strings("files"), vec!["a.py", "b.py"]);
        assert_eq!(item.metadata_strings("one"), vec!["solo"]);
        assert!(item.metadata_strings("num").is_empty());
        assert!(item.metadata_strings("missing").is_empty());
    }
}
