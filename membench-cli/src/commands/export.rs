//! `membench export <runId>`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use membench_storage::ResultsStore;

use crate::Context;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Run id to export
    run_id: String,

    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    format: ExportFormat,

    /// Output path; defaults to {runId}.json / {runId}.csv
    #[arg(long)]
    output: Option<PathBuf>,
}

pub async fn execute(ctx: &Context, args: ExportArgs) -> Result<()> {
    let store = ResultsStore::open(&ctx.results_db()).await?;
    let path = args.output.unwrap_or_else(|| {
        let extension = match args.format {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        };
        PathBuf::from(format!("{}.{extension}", args.run_id))
    });

    match args.format {
        ExportFormat::Json => store.export_json(&args.run_id, &path).await?,
        ExportFormat::Csv => store.export_csv(&args.run_id, &path).await?,
    }
    ctx.writer
        .success(&format!("exported run {} to {}", args.run_id, path.display()));
    Ok(())
}
