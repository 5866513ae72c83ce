//! repobatch: batch ingestion of records into repository objects
//!
//! The `run` command executes the pipeline against an in-memory store, which
//! makes it a dry run: it validates sources, policies and transforms and
//! reports what a real ingestion would commit.

use anyhow::Result;
use clap::{Parser, Subcommand};
use repobatch::{
    config::{Config, LogFormat},
    document::TransformRegistry,
    ingest::{
        default_checkpoint_path, BatchContext, BatchPipelineBuilder, DelimitedSource,
        DirectorySource, ItemFactory, ItemSource, SourceFormat,
    },
    repository::MemoryRepository,
    types::{ContentModel, Namespace, Pid},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repobatch")]
#[command(about = "Batch ingestion of records into repository objects")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "repobatch.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a source (dry run against an in-memory store)
    Run {
        /// Source: a delimited record list file or a directory of records
        source: PathBuf,

        /// Parent container the objects become members of
        #[arg(long)]
        parent: Option<String>,

        /// Preprocess only; leave commit to a later pass
        #[arg(long)]
        defer_commit: bool,

        /// Resume from the checkpoint next to the source, if present
        #[arg(long)]
        resume: bool,

        /// Suppress the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print a saved batch checkpoint
    Status {
        /// Checkpoint file path
        checkpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run {
            source,
            parent,
            defer_commit,
            resume,
            quiet,
        } => run(&config, &source, parent, defer_commit, resume, quiet),
        Commands::Status { checkpoint } => status(&checkpoint),
    }
}

fn init_logging(config: &Config, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.directive(verbosity)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn open_source(path: &Path, factory: ItemFactory) -> Result<Box<dyn ItemSource>> {
    match SourceFormat::detect(path) {
        Some(SourceFormat::DelimitedXml) => Ok(Box::new(DelimitedSource::open(path, factory)?)),
        Some(SourceFormat::Directory) => Ok(Box::new(DirectorySource::open(path, factory)?)),
        None => anyhow::bail!("Unrecognized source format: {}", path.display()),
    }
}

fn run(
    config: &Config,
    source_path: &Path,
    parent: Option<String>,
    defer_commit: bool,
    resume: bool,
    quiet: bool,
) -> Result<()> {
    let factory = ItemFactory::new(
        config
            .ingest
            .content_models
            .iter()
            .map(|m| ContentModel::new(m.as_str()))
            .collect(),
        Namespace::new(config.ingest.default_namespace.as_str()),
        Arc::new(TransformRegistry::with_builtins()),
        config.ingest.transform_ref.as_str(),
    );
    let source = open_source(source_path, factory)?;

    let parent_id = Pid(parent.unwrap_or_else(|| config.ingest.parent_id.clone()));
    let checkpoint_path = config
        .ingest
        .checkpoint_path
        .clone()
        .unwrap_or_else(|| default_checkpoint_path(source_path));

    let mut ctx = if resume && checkpoint_path.exists() {
        let ctx = BatchContext::load(&checkpoint_path)?;
        info!(
            "Resuming from checkpoint: {} of {} items done",
            ctx.progress, ctx.max
        );
        ctx
    } else {
        BatchContext::new(0)
    };

    let repo = Arc::new(MemoryRepository::new());
    let mut pipeline = BatchPipelineBuilder::new(source, repo, parent_id)
        .with_control_group(config.ingest.control_group)
        .with_commit_immediately(config.ingest.commit_immediately && !defer_commit)
        .with_checkpoint(&checkpoint_path)
        .with_quiet(quiet)
        .build();

    let report = pipeline.run(&mut ctx)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.draft_failures.is_empty() || !report.preprocess_failures.is_empty() {
        anyhow::bail!("Run finished with errors");
    }
    Ok(())
}

fn status(checkpoint: &Path) -> Result<()> {
    let ctx = BatchContext::load(checkpoint)?;
    println!(
        "{} of {} items done, last updated {}",
        ctx.progress, ctx.max, ctx.updated
    );
    Ok(())
}
