//! `membench download` — verifies local dataset presence. Network
//! retrieval is handled by external tooling; this command reports what
//! is in place and what is missing.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;

use membench_packs::PackRegistry;

use crate::config::load_config_dir;
use crate::Context;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Benchmarks to check (comma-separated)
    #[arg(long, value_delimiter = ',')]
    benchmarks: Vec<String>,

    /// Single benchmark to check
    #[arg(long)]
    benchmark: Option<String>,

    /// Check every configured benchmark
    #[arg(long)]
    all: bool,

    /// Restrict to one code task type (function|line|api|all)
    #[arg(long)]
    task_type: Option<String>,
}

pub async fn execute(ctx: &Context, args: DownloadArgs) -> Result<()> {
    let packs = PackRegistry::with_defaults();
    let configs = load_config_dir(&ctx.config_dir, &packs)?;

    let mut selected: Vec<String> = args.benchmarks.clone();
    if let Some(single) = args.benchmark {
        selected.push(single);
    }
    if args.all || selected.is_empty() {
        selected = configs.benchmarks.iter().map(|b| b.name.clone()).collect();
    }
    if let Some(task_type) = &args.task_type {
        if task_type != "all" {
            let needle = format!("code-retrieval-{task_type}");
            selected.retain(|name| !name.starts_with("code-retrieval-") || *name == needle);
        }
    }

    let mut missing = 0usize;
    for name in &selected {
        let Some(config) = configs.benchmarks.iter().find(|b| b.name == *name) else {
            ctx.writer.warning(&format!("unknown benchmark '{name}'"));
            missing += 1;
            continue;
        };
        if Path::new(&config.data.path).exists() {
            ctx.writer
                .success(&format!("{name}: {} present", config.data.path));
        } else {
            ctx.writer
                .warning(&format!("{name}: {} missing", config.data.path));
            missing += 1;
        }
    }

    if missing > 0 {
        bail!("{missing} dataset(s) missing; fetch them with your dataset tooling and re-run");
    }
    ctx.writer.success("all datasets present");
    Ok(())
}
