//! CLI rendering: status lines, aligned detail blocks, listings, and
//! the metrics and comparison tables.

use std::io::IsTerminal;

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;
use serde_json::Value;

use membench_core::domain::{MetricResult, PairReport};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// Compact format (single line per item)
    Compact,
}

/// Outcome class of a status line: glyph, color, and target stream in
/// one place. Errors go to stderr, everything else to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Info,
    Warning,
    Error,
}

impl Status {
    fn glyph(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Info => "ℹ",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Status::Success => "ok",
            Status::Info => "info",
            Status::Warning => "warning",
            Status::Error => "error",
        }
    }

    fn paint(self, text: &str) -> ColoredString {
        match self {
            Status::Success => text.green(),
            Status::Info => text.blue(),
            Status::Warning => text.yellow(),
            Status::Error => text.red(),
        }
    }
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color || !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }
        Self { format }
    }

    /// One status line. Table mode gets the colored glyph; the
    /// machine-readable formats get a `label: message` prefix instead.
    pub fn status(&self, status: Status, message: &str) {
        let line = if self.format == OutputFormat::Table {
            format!("{} {message}", status.paint(status.glyph()))
        } else {
            format!("{}: {message}", status.label())
        };
        match status {
            Status::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }

    pub fn success(&self, message: &str) {
        self.status(Status::Success, message);
    }

    pub fn info(&self, message: &str) {
        self.status(Status::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.status(Status::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.status(Status::Error, message);
    }

    pub fn render(&self, listing: Listing) -> Result<()> {
        listing.render(self.format)
    }
}

/// A renderable list of entities. Each row carries both its table cells
/// and the serialized entity, so one `Listing` serves all three output
/// formats without a per-row trait.
pub struct Listing {
    headers: &'static [&'static str],
    rows: Vec<Vec<String>>,
    entities: Vec<Value>,
}

impl Listing {
    pub fn new(headers: &'static [&'static str]) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn row<T: Serialize>(&mut self, entity: &T, cells: Vec<String>) -> Result<()> {
        debug_assert_eq!(cells.len(), self.headers.len());
        self.entities.push(serde_json::to_value(entity)?);
        self.rows.push(cells);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn render(self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Table => {
                if self.rows.is_empty() {
                    println!("{}", "no entries".dimmed());
                    return Ok(());
                }
                let mut table = styled_table(self.headers);
                for cells in self.rows {
                    table.add_row(cells);
                }
                println!("{table}");
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&self.entities)?);
            }
            OutputFormat::Compact => {
                for cells in self.rows {
                    println!("{}", cells.join("\t"));
                }
            }
        }
        Ok(())
    }
}

/// Aligned label/value block for `describe`-style output. Labels are
/// right-aligned to the widest one; empty lists and absent values are
/// dropped rather than printed blank.
pub struct Details {
    title: String,
    fields: Vec<(String, String)>,
}

impl Details {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    pub fn optional(self, label: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.field(label, value),
            None => self,
        }
    }

    pub fn list(self, label: impl Into<String>, values: &[String]) -> Self {
        if values.is_empty() {
            self
        } else {
            self.field(label, values.join(", "))
        }
    }

    pub fn print(self) {
        heading(&self.title);
        let width = self
            .fields
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        for (label, value) in &self.fields {
            let padded = format!("{label:>width$}");
            println!("  {}  {}", padded.dimmed(), value);
        }
    }
}

pub fn heading(text: &str) {
    println!("\n{}", text.bold());
    println!("{}", "─".repeat(text.chars().count().max(4)).dimmed());
}

fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// The per-pair metrics table printed after a run.
pub fn print_pair_reports(pairs: &[PairReport]) {
    let mut table = styled_table(&[
        "Benchmark",
        "Provider",
        "Items",
        "Completed",
        "Failed",
        "Accuracy",
        "Status",
    ]);
    for pair in pairs {
        let status = match &pair.error {
            Some(error) => Cell::new(error).fg(Color::Red),
            None => Cell::new("ok").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(&pair.benchmark),
            Cell::new(&pair.provider),
            Cell::new(pair.total_items.to_string()),
            Cell::new(pair.completed_items.to_string()),
            Cell::new(pair.failed_items.to_string()),
            Cell::new(format!("{:.1}%", pair.accuracy * 100.0)),
            status,
        ]);
    }
    println!("{table}");

    for pair in pairs {
        if pair.metrics.is_empty() {
            continue;
        }
        heading(&format!("{} × {}", pair.benchmark, pair.provider));
        print_metric_results(&pair.metrics);
    }
}

pub fn print_metric_results(metrics: &[MetricResult]) {
    let mut table = styled_table(&["Metric", "Value"]);
    for metric in metrics {
        table.add_row(vec![
            Cell::new(&metric.name),
            Cell::new(format!("{:.4}", metric.value)),
        ]);
    }
    println!("{table}");
}

/// Provider comparison for one benchmark, with optional baseline deltas.
pub fn print_comparison(benchmark: &str, rows: &[(String, f64, i64)], baseline: Option<&str>) {
    let baseline_accuracy = baseline.and_then(|name| {
        rows.iter()
            .find(|(provider, _, _)| provider == name)
            .map(|(_, accuracy, _)| *accuracy)
    });

    let headers: Vec<&str> = if baseline_accuracy.is_some() {
        vec!["Provider", "Accuracy", "Items", "Δ vs baseline"]
    } else {
        vec!["Provider", "Accuracy", "Items"]
    };
    let mut table = styled_table(&headers);
    for (provider, accuracy, total) in rows {
        let mut cells = vec![
            Cell::new(provider),
            Cell::new(format!("{:.1}%", accuracy * 100.0)),
            Cell::new(total.to_string()),
        ];
        if let Some(base) = baseline_accuracy {
            let delta = (accuracy - base) * 100.0;
            let cell = Cell::new(format!("{delta:+.1}%"));
            cells.push(if delta >= 0.0 {
                cell.fg(Color::Green)
            } else {
                cell.fg(Color::Red)
            });
        }
        table.add_row(cells);
    }
    println!("Benchmark: {}", benchmark.bold());
    println!("{table}");
}
