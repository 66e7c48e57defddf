use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

// ===== Data Source =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DataSourceKind {
    Local,
    RemoteRegistry,
    Url,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataFormat {
    #[serde(rename = "tabular")]
    Tabular,
    #[serde(rename = "line-delimited-records")]
    JsonLines,
    #[serde(rename = "record-array")]
    JsonArray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub kind: DataSourceKind,
    pub path: String,
    pub format: DataFormat,
}

// ===== Schema Mapping =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Array,
    Object,
    String,
}

/// Field names for datasets that nest several questions under one record.
/// Synthesized item ids take the form `"{parent_id}-q{index}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedQuestions {
    pub field: String,
    #[serde(default = "default_question_field")]
    pub question: String,
    #[serde(default = "default_answer_field")]
    pub answer: String,
}

/// How to extract retrieval contexts from a raw record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSchema {
    pub kind: ContextKind,
    /// Dot-path to the context container inside the raw record.
    pub field: String,
    /// Template composing one element's content, e.g. `"{speaker}: {text}"`.
    #[serde(default)]
    pub item_template: Option<String>,
    /// Regex selecting session keys when `kind == object`.
    #[serde(default)]
    pub session_pattern: Option<String>,
    /// Per-element date field.
    #[serde(default)]
    pub date_field: Option<String>,
    /// Dot-path to a positional date array on the record.
    #[serde(default)]
    pub date_array: Option<String>,
    /// Per-element dataset-native corpus identifier.
    #[serde(default)]
    pub corpus_id_field: Option<String>,
    /// Per-turn dialog id field for conversational datasets.
    #[serde(default)]
    pub dialog_id_field: Option<String>,
    /// Dot-path to answer-evidence ids on the record or nested question.
    #[serde(default)]
    pub evidence_field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_id_field")]
    pub id: String,
    #[serde(default = "default_question_field")]
    pub question: String,
    #[serde(default = "default_answer_field")]
    pub answer: String,
    #[serde(default)]
    pub questions: Option<NestedQuestions>,
    pub context: ContextSchema,
    /// Metadata key -> dot-path into the raw record.
    #[serde(default)]
    pub metadata_fields: HashMap<String, String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_question_field() -> String {
    "question".to_string()
}

fn default_answer_field() -> String {
    "answer".to_string()
}

// ===== Runtime Directives =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    #[serde(default)]
    pub format_template: Option<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            batch_delay_ms: 0,
            format_template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDefaults {
    pub top_k: usize,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub include_chunks: bool,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            top_k: 10,
            threshold: None,
            include_chunks: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Evaluator name dispatched through the evaluator registry.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub answer_model: Option<String>,
    #[serde(default)]
    pub answer_prompt: Option<String>,
    #[serde(default)]
    pub judge_model: Option<String>,
    #[serde(default)]
    pub judge_prompt: Option<String>,
    #[serde(default)]
    pub custom_evaluator: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointGranularity {
    #[default]
    Item,
    Phase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub checkpoint: CheckpointGranularity,
    pub resumable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            checkpoint: CheckpointGranularity::Item,
            resumable: true,
        }
    }
}

// ===== Benchmark Config =====

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BenchmarkConfig {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub data: DataSourceConfig,
    pub schema: SchemaConfig,
    /// Question-type catalog for filtering and per-type breakdowns.
    #[serde(default)]
    pub question_types: Vec<String>,
    /// Numeric category -> human-readable name.
    #[serde(default)]
    pub category_map: HashMap<String, String>,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub search: SearchDefaults,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl BenchmarkConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn category_name(&self, category: &str) -> Option<&str> {
        self.category_map.get(category).map(String::as_str)
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_format_wire_names() {
        assert_eq!(
            serde_json::to_string(&DataFormat::JsonLines).unwrap(),
            "\"line-delimited-records\""
        );
        assert_eq!(
            serde_json::from_str::<DataFormat>("\"record-array\"").unwrap(),
            DataFormat::JsonArray
        );
        assert_eq!(
            serde_json::from_str::<DataFormat>("\"tabular\"").unwrap(),
            DataFormat::Tabular
        );
    }

    #[test]
    fn minimal_config_deserializes_with_defaults() {
        let yaml = r#"
name: sample
data:
  kind: local
  path: data/sample.jsonl
  format: line-delimited-records
schema:
  context:
    kind: string
    field: context
"#;
        let config: BenchmarkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "sample");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.schema.id, "id");
        assert_eq!(config.search.top_k, 10);
        assert!(config.runtime.resumable);
        assert_eq!(config.runtime.checkpoint, CheckpointGranularity::Item);
    }
}
