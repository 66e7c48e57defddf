//! Schema-driven mapping from raw records to benchmark items.

use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::warn;

use membench_core::domain::{
    BenchmarkConfig, BenchmarkItem, ContextKind, ContextSchema, NestedQuestions, PreparedData,
};
use membench_core::traits::{ItemFilters, Loader};
use membench_core::{keys, Result};

use crate::fields::{first_string, get_array, get_path, get_string};
use crate::reader::read_records;

/// The default loader: any benchmark without a specialized loader goes
/// through schema mapping.
pub struct SchemaLoader;

#[async_trait]
impl Loader for SchemaLoader {
    fn name(&self) -> &str {
        "schema"
    }

    async fn load(
        &self,
        config: &BenchmarkConfig,
        filters: &ItemFilters,
    ) -> Result<Vec<BenchmarkItem>> {
        let outcome = read_records(Path::new(&config.data.path), config.data.format).await?;

        let mut items = Vec::new();
        let mut missing_ids = 0usize;
        for record in &outcome.records {
            match &config.schema.questions {
                Some(nested) => {
                    map_nested_record(config, record, nested, &mut items, &mut missing_ids)
                }
                None => {
                    if let Some(item) = map_record(config, record, &mut missing_ids) {
                        items.push(item);
                    }
                }
            }
        }

        if missing_ids > 0 {
            warn!(
                benchmark = %config.name,
                count = missing_ids,
                "records skipped for missing ids"
            );
        }

        Ok(filters.apply(items))
    }
}

fn map_record(
    config: &BenchmarkConfig,
    record: &Value,
    missing_ids: &mut usize,
) -> Option<BenchmarkItem> {
    let schema = &config.schema;
    let Some(id) = get_string(record, &schema.id) else {
        *missing_ids += 1;
        return None;
    };

    let question = get_string(record, &schema.question).unwrap_or_default();
    let answer = get_string(record, &schema.answer).unwrap_or_default();

    let mut item = BenchmarkItem::new(&id, question, answer)
        .with_contexts(extract_contexts(&schema.context, record, &id));
    attach_supplementary(config, &mut item, record, record);
    Some(item)
}

fn map_nested_record(
    config: &BenchmarkConfig,
    record: &Value,
    nested: &NestedQuestions,
    items: &mut Vec<BenchmarkItem>,
    missing_ids: &mut usize,
) {
    let schema = &config.schema;
    let Some(parent_id) = get_string(record, &schema.id) else {
        *missing_ids += 1;
        return;
    };

    let Some(questions) = get_array(record, &nested.field) else {
        return;
    };

    for (index, question_value) in questions.iter().enumerate() {
        let id = BenchmarkItem::nested_id(&parent_id, index);
        let question = get_string(question_value, &nested.question).unwrap_or_default();
        let answer = get_string(question_value, &nested.answer).unwrap_or_default();

        let mut item = BenchmarkItem::new(&id, question, answer)
            .with_contexts(extract_contexts(&schema.context, record, &id));
        // question-level fields shadow record-level ones
        attach_supplementary(config, &mut item, question_value, record);
        items.push(item);
    }
}

/// Question type, category, declared metadata paths, and answer-evidence
/// ids. `primary` is consulted before `fallback` so nested questions can
/// shadow their parent record.
fn attach_supplementary(
    config: &BenchmarkConfig,
    item: &mut BenchmarkItem,
    primary: &Value,
    fallback: &Value,
) {
    let schema = &config.schema;

    if let Some(path) = &schema.question_type {
        if let Some(qt) = get_string(primary, path).or_else(|| get_string(fallback, path)) {
            item.metadata
                .insert(keys::QUESTION_TYPE.to_string(), Value::String(qt.clone()));
            item.question_type = Some(qt);
        }
    }
    if let Some(path) = &schema.category {
        if let Some(category) = get_string(primary, path).or_else(|| get_string(fallback, path)) {
            item.metadata.insert(
                keys::CATEGORY.to_string(),
                Value::String(category.clone()),
            );
            item.category = Some(category);
        }
    }
    for (meta_key, path) in &schema.metadata_fields {
        if let Some(value) = get_path(primary, path).or_else(|| get_path(fallback, path)) {
            item.metadata.insert(meta_key.clone(), value.clone());
        }
    }
    if let Some(path) = &schema.context.evidence_field {
        let evidence = get_path(primary, path)
            .or_else(|| get_path(fallback, path))
            .map(value_to_strings)
            .unwrap_or_default();
        if !evidence.is_empty() {
            item.metadata.insert(
                keys::EVIDENCE_IDS.to_string(),
                Value::Array(evidence.into_iter().map(Value::String).collect()),
            );
        }
    }
}

fn extract_contexts(schema: &ContextSchema, record: &Value, item_id: &str) -> Vec<PreparedData> {
    match schema.kind {
        ContextKind::String => extract_string_context(schema, record, item_id),
        ContextKind::Array => extract_array_contexts(schema, record, item_id),
        ContextKind::Object => extract_object_contexts(schema, record, item_id),
    }
}

fn extract_string_context(
    schema: &ContextSchema,
    record: &Value,
    item_id: &str,
) -> Vec<PreparedData> {
    match get_string(record, &schema.field) {
        Some(content) => vec![PreparedData::new(
            PreparedData::context_id(item_id, None, 0),
            content,
        )],
        None => Vec::new(),
    }
}

fn extract_array_contexts(
    schema: &ContextSchema,
    record: &Value,
    item_id: &str,
) -> Vec<PreparedData> {
    let Some(elements) = get_array(record, &schema.field) else {
        return Vec::new();
    };
    let dates = schema
        .date_array
        .as_deref()
        .and_then(|path| get_array(record, path));

    let mut contexts = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let (content, dialog_ids) = element_content(schema, element);
        if content.is_empty() {
            continue;
        }

        let corpus_key = schema
            .corpus_id_field
            .as_deref()
            .and_then(|field| get_string(element, field));
        let id = PreparedData::context_id(item_id, corpus_key.as_deref(), index);

        let mut context = PreparedData::new(id, content);
        let date = schema
            .date_field
            .as_deref()
            .and_then(|field| get_string(element, field))
            .or_else(|| {
                dates
                    .and_then(|d| d.get(index))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        if let Some(date) = date {
            context = context.with_metadata("date", Value::String(date));
        }
        if let Some(key) = corpus_key {
            context = context.with_metadata(keys::CORPUS_ID, Value::String(key));
        }
        if !dialog_ids.is_empty() {
            context = context.with_metadata(
                keys::DIALOG_IDS,
                Value::Array(dialog_ids.into_iter().map(Value::String).collect()),
            );
        }
        contexts.push(context);
    }
    contexts
}

fn extract_object_contexts(
    schema: &ContextSchema,
    record: &Value,
    item_id: &str,
) -> Vec<PreparedData> {
    let Some(container) = get_path(record, &schema.field).and_then(Value::as_object) else {
        return Vec::new();
    };
    let session_pattern = schema
        .session_pattern
        .as_deref()
        .and_then(|p| Regex::new(p).ok());

    let mut contexts = Vec::new();
    for (key, value) in container {
        if is_date_companion(key) {
            continue;
        }
        if let Some(pattern) = &session_pattern {
            if !pattern.is_match(key) {
                continue;
            }
        }

        let (content, dialog_ids) = element_content(schema, value);
        if content.is_empty() {
            continue;
        }

        let mut context = PreparedData::new(
            PreparedData::context_id(item_id, Some(key), contexts.len()),
            content,
        )
        .with_metadata(keys::CORPUS_ID, Value::String(key.clone()));

        let date = container
            .get(&format!("{key}_date_time"))
            .or_else(|| container.get(&format!("{key}_date")))
            .and_then(Value::as_str);
        if let Some(date) = date {
            context = context.with_metadata("date", Value::String(date.to_string()));
        }
        if !dialog_ids.is_empty() {
            context = context.with_metadata(
                keys::DIALOG_IDS,
                Value::Array(dialog_ids.into_iter().map(Value::String).collect()),
            );
        }
        contexts.push(context);
    }
    contexts
}

fn is_date_companion(key: &str) -> bool {
    key.ends_with("_date_time") || key.ends_with("_date") || key.ends_with("_timestamp")
}

/// Content of one context element plus any per-turn dialog ids.
fn element_content(schema: &ContextSchema, element: &Value) -> (String, Vec<String>) {
    if let Some(template) = &schema.item_template {
        return (render_template(template, element), Vec::new());
    }
    match element {
        Value::String(s) => (s.clone(), Vec::new()),
        Value::Array(turns) => join_turns(turns, schema.dialog_id_field.as_deref()),
        Value::Object(_) => (
            first_string(element, &["text", "content"]).unwrap_or_default(),
            Vec::new(),
        ),
        _ => (String::new(), Vec::new()),
    }
}

/// Joins conversational turns as `"{speaker|role}: {text|content}"` lines.
fn join_turns(turns: &[Value], dialog_id_field: Option<&str>) -> (String, Vec<String>) {
    let mut lines = Vec::with_capacity(turns.len());
    let mut dialog_ids = Vec::new();
    for turn in turns {
        let speaker = first_string(turn, &["speaker", "role"]);
        let text = first_string(turn, &["text", "content"]);
        match (speaker, text) {
            (Some(speaker), Some(text)) => lines.push(format!("{speaker}: {text}")),
            (None, Some(text)) => lines.push(text),
            _ => continue,
        }
        if let Some(field) = dialog_id_field {
            if let Some(id) = get_string(turn, field) {
                dialog_ids.push(id);
            }
        }
    }
    (lines.join("\n"), dialog_ids)
}

fn template_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_.]+)\}").expect("static pattern"))
}

/// Substitutes `{field}` placeholders from the element; unknown fields
/// are preserved verbatim.
fn render_template(template: &str, element: &Value) -> String {
    template_pattern()
        .replace_all(template, |caps: &Captures<'_>| {
            get_string(element, &caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn value_to_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Array(values) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}
