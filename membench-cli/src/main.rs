//! membench: benchmark harness for memory and retrieval providers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod adapters;
mod commands;
mod config;
mod output;

use output::{OutputFormat, OutputWriter};

#[derive(Debug, Parser)]
#[command(
    name = "membench",
    version,
    about = "Benchmark harness for memory and retrieval providers"
)]
struct Cli {
    /// Directory holding benchmarks/*.yaml and providers/*.yaml
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    /// Output directory for results.db and checkpoints
    #[arg(long, global = true, default_value = "membench-out")]
    output: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List registered benchmarks and providers
    List(commands::list::ListArgs),
    /// Show details of one benchmark or provider
    Describe(commands::describe::DescribeArgs),
    /// Verify local dataset presence
    Download(commands::download::DownloadArgs),
    /// Run benchmarks against providers
    Eval(commands::eval::EvalArgs),
    /// Inspect a stored run
    Results(commands::results::ResultsArgs),
    /// Export a run to JSON or CSV
    Export(commands::export::ExportArgs),
    /// Provider comparison table for one benchmark
    Table(commands::table::TableArgs),
}

pub struct Context {
    pub config_dir: PathBuf,
    pub output_dir: PathBuf,
    pub writer: OutputWriter,
}

impl Context {
    pub fn results_db(&self) -> PathBuf {
        self.output_dir.join("results.db")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.output_dir.join("checkpoints")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("membench=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // invalid arguments exit 1; --help and --version exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let is_usage = e.use_stderr();
            let _ = e.print();
            return if is_usage { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    let ctx = Context {
        config_dir: cli.config_dir,
        output_dir: cli.output,
        writer: OutputWriter::new(cli.format, cli.no_color),
    };

    let outcome = match cli.command {
        Commands::List(args) => commands::list::execute(&ctx, args).await,
        Commands::Describe(args) => commands::describe::execute(&ctx, args).await,
        Commands::Download(args) => commands::download::execute(&ctx, args).await,
        Commands::Eval(args) => commands::eval::execute(&ctx, args).await,
        Commands::Results(args) => commands::results::execute(&ctx, args).await,
        Commands::Export(args) => commands::export::execute(&ctx, args).await,
        Commands::Table(args) => commands::table::execute(&ctx, args).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ctx.writer.error(&format!("{e:#}"));
            ExitCode::from(1)
        }
    }
}
