//! Code-retrieval loaders.
//!
//! These bypass schema mapping: items come straight from task descriptor
//! files, with contexts drawn from inline corpora or repo snapshots and
//! ground-truth metadata attached for the downstream packs and metrics.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use membench_core::domain::{BenchmarkConfig, BenchmarkItem, PreparedData};
use membench_core::traits::{ItemFilters, Loader};
use membench_core::{keys, CoreError, Result};

use crate::fields::{first_string, get_path};
use crate::reader::read_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeTaskType {
    Function,
    Line,
    Api,
    CrossFile,
}

impl CodeTaskType {
    fn loader_name(&self) -> &'static str {
        match self {
            CodeTaskType::Function => "code-function",
            CodeTaskType::Line => "code-line",
            CodeTaskType::Api => "code-api",
            CodeTaskType::CrossFile => "code-cross-file",
        }
    }
}

pub struct CodeRetrievalLoader {
    task_type: CodeTaskType,
}

impl CodeRetrievalLoader {
    pub fn new(task_type: CodeTaskType) -> Self {
        Self { task_type }
    }

    pub fn function() -> Self {
        Self::new(CodeTaskType::Function)
    }

    pub fn line() -> Self {
        Self::new(CodeTaskType::Line)
    }

    pub fn api() -> Self {
        Self::new(CodeTaskType::Api)
    }

    pub fn cross_file() -> Self {
        Self::new(CodeTaskType::CrossFile)
    }

    async fn map_task(
        &self,
        task: &Value,
        dataset_dir: &Path,
        missing_ids: &mut usize,
    ) -> Result<Option<BenchmarkItem>> {
        let Some(id) = first_string(task, &["id", "task_id"]) else {
            *missing_ids += 1;
            return Ok(None);
        };

        let question = first_string(task, &["question", "query"]).unwrap_or_default();
        let answer = first_string(task, &["answer"])
            .or_else(|| ground_truth_file(task))
            .unwrap_or_default();

        let contexts = self.load_contexts(task, &id, dataset_dir).await?;
        let mut item = BenchmarkItem::new(&id, question, answer).with_contexts(contexts);

        attach_ground_truth(&mut item, task);
        item.metadata.insert(
            keys::QUESTION_TYPE.to_string(),
            Value::String(self.task_type.loader_name().to_string()),
        );
        item.question_type = Some(self.task_type.loader_name().to_string());
        Ok(Some(item))
    }

    /// Contexts from an inline `corpus` array or a repo snapshot
    /// (`repo_dir` plus a `files` list relative to it).
    async fn load_contexts(
        &self,
        task: &Value,
        item_id: &str,
        dataset_dir: &Path,
    ) -> Result<Vec<PreparedData>> {
        if let Some(corpus) = get_path(task, "corpus").and_then(Value::as_array) {
            let mut contexts = Vec::with_capacity(corpus.len());
            for entry in corpus {
                let Some(path) = first_string(entry, &["path", "filepath"]) else {
                    continue;
                };
                let Some(content) = first_string(entry, &["content"]) else {
                    continue;
                };
                contexts.push(file_context(item_id, &path, content));
            }
            return Ok(contexts);
        }

        let Some(repo_dir) = first_string(task, &["repo_dir"]) else {
            return Ok(Vec::new());
        };
        let repo_root = resolve_repo_root(dataset_dir, &repo_dir);
        let files: Vec<String> = get_path(task, "files")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut contexts = Vec::with_capacity(files.len());
        for file in files {
            let full = repo_root.join(&file);
            match tokio::fs::read_to_string(&full).await {
                Ok(content) => contexts.push(file_context(item_id, &file, content)),
                Err(e) => {
                    warn!(file = %full.display(), error = %e, "skipping unreadable snapshot file");
                }
            }
        }
        Ok(contexts)
    }
}

#[async_trait]
impl Loader for CodeRetrievalLoader {
    fn name(&self) -> &str {
        self.task_type.loader_name()
    }

    async fn load(
        &self,
        config: &BenchmarkConfig,
        filters: &ItemFilters,
    ) -> Result<Vec<BenchmarkItem>> {
        let path = Path::new(&config.data.path);
        let outcome = read_records(path, config.data.format).await?;
        let dataset_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let mut items = Vec::new();
        let mut missing_ids = 0usize;
        for task in &outcome.records {
            if let Some(item) = self.map_task(task, &dataset_dir, &mut missing_ids).await? {
                items.push(item);
            }
        }
        if missing_ids > 0 {
            warn!(
                benchmark = %config.name,
                count = missing_ids,
                "tasks skipped for missing ids"
            );
        }

        if items.is_empty() && outcome.records.is_empty() {
            return Err(CoreError::Dataset(format!(
                "no tasks found in {}",
                path.display()
            )));
        }
        Ok(filters.apply(items))
    }
}

fn file_context(item_id: &str, path: &str, content: String) -> PreparedData {
    let key = path.replace(['/', '\\'], "_");
    PreparedData::new(PreparedData::context_id(item_id, Some(&key), 0), content)
        .with_metadata(keys::FILEPATH, Value::String(path.to_string()))
}

fn resolve_repo_root(dataset_dir: &Path, repo_dir: &str) -> PathBuf {
    let candidate = Path::new(repo_dir);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        dataset_dir.join(candidate)
    }
}

fn ground_truth_file(task: &Value) -> Option<String> {
    first_string(task, &["ground_truth.file", "groundTruth.file"])
}

/// Copies whichever ground-truth channels the task carries into item
/// metadata, normalized to the camelCase keys metrics expect.
fn attach_ground_truth(item: &mut BenchmarkItem, task: &Value) {
    let location = get_path(task, "ground_truth").or_else(|| get_path(task, "groundTruth"));
    if let Some(location) = location {
        let file = first_string(location, &["file"]);
        let start = get_path(location, "start_line")
            .or_else(|| get_path(location, "startLine"))
            .and_then(Value::as_u64);
        let end = get_path(location, "end_line")
            .or_else(|| get_path(location, "endLine"))
            .and_then(Value::as_u64);
        if let (Some(file), Some(start), Some(end)) = (file, start, end) {
            item.metadata.insert(
                keys::GROUND_TRUTH.to_string(),
                serde_json::json!({"file": file, "startLine": start, "endLine": end}),
            );
        }
    }

    for (source, target) in [
        ("gold_snippets", keys::GOLD_SNIPPETS),
        ("dependency_files", keys::DEPENDENCY_FILES),
        ("modified_files", keys::MODIFIED_FILES),
    ] {
        let value = get_path(task, source)
            .or_else(|| get_path(task, target))
            .or_else(|| get_path(task, &format!("patch.{source}")));
        if let Some(Value::Array(values)) = value {
            item.metadata
                .insert(target.to_string(), Value::Array(values.clone()));
        }
    }
}
