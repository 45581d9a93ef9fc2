use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use search_buddy::config::{find_config_file, load_config, Config};
use search_buddy::output::{render_table, write_csv, write_json};
use search_buddy::pipeline::Pipeline;
use search_buddy::ui::{print_summary, styled_icon, BatchProgress, Status};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Search Buddy - Extract bibliographic metadata and detect positionality statements in scholarly PDFs
#[derive(Parser, Debug)]
#[command(name = "search-buddy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract bibliographic metadata and detect positionality statements in scholarly PDFs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for batch results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of records
    Json,
    /// Human-readable table
    Table,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process every PDF in a folder
    #[command(alias = "s")]
    Scan {
        /// Folder containing the PDFs
        folder: PathBuf,

        /// Write results to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Number of documents processed concurrently
        #[arg(long, short)]
        workers: Option<usize>,

        /// Skip the LLM-backed detection passes
        #[arg(long)]
        no_llm: bool,

        /// Override the reasoning model
        #[arg(long)]
        model: Option<String>,

        /// Custom detection instruction sent to the model
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Run the pipeline on one PDF and print the details as JSON
    #[command(alias = "i")]
    Inspect {
        /// Path to the PDF
        pdf: PathBuf,

        /// Skip the LLM-backed detection passes
        #[arg(long)]
        no_llm: bool,

        /// Custom detection instruction sent to the model
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(verbose: u8, quiet: bool, configured: &str) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("search_buddy={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    load_config(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = resolve_config(cli.config.as_deref())?;
    init_tracing(cli.verbose, cli.quiet, &config.logging.level);

    match cli.command {
        Commands::Scan {
            folder,
            output,
            format,
            workers,
            no_llm,
            model,
            prompt,
        } => {
            if prompt.is_some() {
                config.llm.detection_prompt = prompt;
            }
            if let Some(workers) = workers {
                config.pipeline.workers = workers;
            }
            if no_llm {
                config.llm.enabled = false;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            scan(&config, &folder, output.as_deref(), format, cli.quiet).await
        }
        Commands::Inspect {
            pdf,
            no_llm,
            prompt,
        } => {
            if prompt.is_some() {
                config.llm.detection_prompt = prompt;
            }
            if no_llm {
                config.llm.enabled = false;
            }
            inspect(&config, &pdf).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn scan(
    config: &Config,
    folder: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    if !pipeline.uses_reasoning() {
        tracing::info!("Running without a reasoning service");
    }

    let paths = Pipeline::list_documents(folder)?;
    let progress = BatchProgress::new(paths.len(), quiet);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing documents already in progress");
                cancel.cancel();
            }
        })
    };

    let report = pipeline
        .run_paths(paths, &cancel, |record| progress.record(record))
        .await;
    ctrl_c.abort();
    progress.finish();

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            emit(&report.records, format, BufWriter::new(file))?;
            if !quiet {
                eprintln!(
                    "{} Wrote {} record(s) to {}",
                    styled_icon(Status::Success),
                    report.records.len(),
                    path.display()
                );
            }
        }
        None => emit(&report.records, format, std::io::stdout().lock())?,
    }

    if !quiet {
        print_summary(
            report.found_count(),
            report.records.len(),
            report.total,
            report.cancelled,
        );
    }
    Ok(())
}

fn emit<W: Write>(
    records: &[search_buddy::OutputRecord],
    format: OutputFormat,
    mut out: W,
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(records, out)?,
        OutputFormat::Json => write_json(records, out)?,
        OutputFormat::Table => {
            writeln!(out, "{}", render_table(records))?;
            out.flush()?;
        }
    }
    Ok(())
}

async fn inspect(config: &Config, pdf: &Path) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let document = pipeline.load(pdf).await;
    let analysis = pipeline.analyze(document).await;

    let details = serde_json::json!({
        "filename": analysis.document.filename(),
        "pages": analysis.document.page_count(),
        "readable": analysis.document.is_readable(),
        "coreWindow": {
            "start": analysis.window.pages.start,
            "end": analysis.window.pages.end,
        },
        "metadata": analysis.metadata,
        "positionality": analysis.positionality,
        "record": analysis.to_record(),
    });
    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}
