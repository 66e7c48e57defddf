//! Raw record reading for the three supported on-disk formats.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use membench_core::domain::DataFormat;
use membench_core::{CoreError, Result};

#[derive(Debug)]
pub struct ReadOutcome {
    pub records: Vec<Value>,
    /// Malformed records skipped with a warning.
    pub skipped: usize,
}

/// Reads all records from `path`. Missing files fail fast; malformed
/// records are skipped and counted.
pub async fn read_records(path: &Path, format: DataFormat) -> Result<ReadOutcome> {
    if !path.exists() {
        return Err(CoreError::Dataset(format!(
            "dataset file not found: {}",
            path.display()
        )));
    }
    let raw = tokio::fs::read_to_string(path).await?;

    match format {
        DataFormat::JsonArray => read_json_array(&raw, path),
        DataFormat::JsonLines => Ok(read_json_lines(&raw, path)),
        DataFormat::Tabular => read_csv(&raw, path),
    }
}

fn read_json_array(raw: &str, path: &Path) -> Result<ReadOutcome> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        CoreError::Dataset(format!("failed to parse {}: {e}", path.display()))
    })?;
    match value {
        Value::Array(records) => Ok(ReadOutcome {
            records,
            skipped: 0,
        }),
        _ => Err(CoreError::Dataset(format!(
            "{} is not a record array",
            path.display()
        ))),
    }
}

fn read_json_lines(raw: &str, path: &Path) -> ReadOutcome {
    let mut records = Vec::new();
    let mut skipped = 0;
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => records.push(value),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "skipping malformed record"
                );
                skipped += 1;
            }
        }
    }
    ReadOutcome { records, skipped }
}

fn read_csv(raw: &str, path: &Path) -> Result<ReadOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| CoreError::Dataset(format!("failed to read {} headers: {e}", path.display())))?
        .clone();

    let mut records = Vec::new();
    let mut skipped = 0;
    for (row_no, row) in reader.records().enumerate() {
        match row {
            Ok(row) => {
                let mut object = Map::new();
                for (header, field) in headers.iter().zip(row.iter()) {
                    object.insert(header.to_string(), Value::String(field.to_string()));
                }
                records.push(Value::Object(object));
            }
            Err(e) => {
                warn!(
                    file = %path.display(),
                    row = row_no + 1,
                    error = %e,
                    "skipping malformed row"
                );
                skipped += 1;
            }
        }
    }
    Ok(ReadOutcome { records, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn missing_file_fails_fast() {
        let err = read_records(Path::new("/nonexistent/data.jsonl"), DataFormat::JsonLines)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Dataset(_)));
    }

    #[tokio::test]
    async fn jsonl_skips_malformed_lines() {
        let file = write_temp("{\"id\": 1}\nnot json\n{\"id\": 2}\n");
        let outcome = read_records(file.path(), DataFormat::JsonLines).await.unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn json_array_parses() {
        let file = write_temp(r#"[{"id": "a"}, {"id": "b"}]"#);
        let outcome = read_records(file.path(), DataFormat::JsonArray).await.unwrap();
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn csv_rows_become_objects() {
        let file = write_temp("id,question,answer\n1,what,because\n2,\"a, b\",c\n");
        let outcome = read_records(file.path(), DataFormat::Tabular).await.unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[1]["question"], "a, b");
    }
}
