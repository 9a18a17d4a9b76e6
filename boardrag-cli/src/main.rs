//! BoardRAG CLI - KiCad board extraction and rule-grounded review.

use std::path::{Path, PathBuf};
use std::process;

use boardrag::config::{
    BUILD_INDEX_LOG_FILE, DEFAULT_DOCS_DIR, DEFAULT_ERROR_LOG, DEFAULT_PERSIST_DIR,
    DEFAULT_REPORT_FILE, DEFAULT_SUMMARY_FILE, EXTRACT_LOG_FILE, INSPECT_LOG_FILE,
};
use boardrag::extract::{extract_board_summary, write_summary};
use boardrag::ai::ollama::is_model_installed;
use boardrag::index::build_index;
use boardrag::report::{write_error_log, write_report};
use boardrag::{
    BuildOutcome, OllamaClient, PipelineConfig, ReportGenerator, VectorStore,
};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

const BANNER_WIDTH: usize = 50;

#[derive(Parser)]
#[command(name = "boardrag")]
#[command(about = "Review KiCad boards against your own design rules", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract traces, vias, components and nets from a board into JSON
    Extract {
        /// Path to a .kicad_pcb file
        #[arg(value_name = "BOARD")]
        board: Option<PathBuf>,

        /// Where to write the summary
        #[arg(short, long, default_value = DEFAULT_SUMMARY_FILE)]
        output: PathBuf,
    },

    /// Build the design-rule index from plain-text documents
    BuildIndex {
        /// Directory of .txt design-rule documents
        #[arg(long, default_value = DEFAULT_DOCS_DIR)]
        docs: PathBuf,

        /// Vector store directory
        #[arg(long, default_value = DEFAULT_PERSIST_DIR)]
        persist_dir: PathBuf,
    },

    /// Review an extracted board against the indexed design rules
    Inspect {
        /// Board summary written by `extract`
        #[arg(long, default_value = DEFAULT_SUMMARY_FILE)]
        summary: PathBuf,

        /// Vector store directory
        #[arg(long, default_value = DEFAULT_PERSIST_DIR)]
        persist_dir: PathBuf,

        /// Where to write the report
        #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
        output: PathBuf,

        /// Language model to ask (overrides BOARDRAG_LLM_MODEL)
        #[arg(long)]
        model: Option<String>,
    },

    /// Show Ollama and vector store status
    Status {
        /// Vector store directory
        #[arg(long, default_value = DEFAULT_PERSIST_DIR)]
        persist_dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Extract { board, output } => handle_extract(board.as_deref(), &output),
        Commands::BuildIndex { docs, persist_dir } => handle_build_index(docs, persist_dir).await,
        Commands::Inspect {
            summary,
            persist_dir,
            output,
            model,
        } => handle_inspect(&summary, persist_dir, &output, model).await,
        Commands::Status {
            persist_dir,
            format,
        } => handle_status(&persist_dir, format).await,
    };

    process::exit(exit_code);
}

fn init_logging(log_file: &str) {
    if let Err(e) = boardrag::logging::init(Path::new(log_file)) {
        eprintln!("Warning: cannot open log file {}: {}", log_file, e);
    }
}

fn handle_extract(board: Option<&Path>, output: &Path) -> i32 {
    let Some(board) = board else {
        eprintln!("Usage: boardrag extract <BOARD>");
        let mut cli = Cli::command();
        if let Some(extract) = cli.find_subcommand_mut("extract") {
            let _ = extract.print_help();
        }
        return 1;
    };

    init_logging(EXTRACT_LOG_FILE);

    let summary = match extract_board_summary(board) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Extraction failed: {}", e);
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if let Err(e) = write_summary(&summary, output) {
        tracing::error!("Failed to write summary: {}", e);
        eprintln!("Error: {}", e);
        return 1;
    }

    println!(
        "Extracted {} tracks, {} vias, {} components, {} nets -> {}",
        summary.tracks.len(),
        summary.vias.len(),
        summary.components.len(),
        summary.nets.len(),
        output.display()
    );
    0
}

async fn handle_build_index(docs: PathBuf, persist_dir: PathBuf) -> i32 {
    init_logging(BUILD_INDEX_LOG_FILE);

    let config = PipelineConfig::from_env()
        .with_docs_dir(docs)
        .with_persist_dir(persist_dir);

    match build_index(&config).await {
        Ok(BuildOutcome::Built { documents, chunks }) => {
            println!(
                "Indexed {} chunks from {} documents into {}",
                chunks,
                documents,
                config.persist_dir.display()
            );
            0
        }
        Ok(outcome) => {
            eprintln!("Error: index not built ({})", describe_outcome(&outcome));
            1
        }
        Err(e) => {
            tracing::error!("Index build failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn describe_outcome(outcome: &BuildOutcome) -> String {
    match outcome {
        BuildOutcome::Built { .. } => "built".to_string(),
        BuildOutcome::MissingDirectory(dir) => format!("directory not found: {}", dir.display()),
        BuildOutcome::NoDocuments(dir) => format!("no .txt files in {}", dir.display()),
        BuildOutcome::NoChunks => "documents produced no chunks".to_string(),
    }
}

async fn handle_inspect(
    summary: &Path,
    persist_dir: PathBuf,
    output: &Path,
    model: Option<String>,
) -> i32 {
    init_logging(INSPECT_LOG_FILE);

    let mut config = PipelineConfig::from_env().with_persist_dir(persist_dir);
    if let Some(model) = model {
        config = config.with_llm_model(model);
    }

    let generator = ReportGenerator::from_config(&config);
    let result = match generator.run(summary).await {
        Ok(report) => write_report(&report, output).map(|_| report),
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            println!("{}", "=".repeat(BANNER_WIDTH));
            println!("PCB review report:");
            println!("{}", "=".repeat(BANNER_WIDTH));
            println!("{}", report);
            let path = std::path::absolute(output).unwrap_or_else(|_| output.to_path_buf());
            println!("\nReport saved to: {}", path.display());
            0
        }
        Err(e) => {
            let message = format!("❌ Error: {}", e);
            tracing::error!("{}", message);
            if let Err(log_err) = write_error_log(&message, Path::new(DEFAULT_ERROR_LOG)) {
                eprintln!("Warning: cannot write {}: {}", DEFAULT_ERROR_LOG, log_err);
            }
            eprintln!("{}", message);
            1
        }
    }
}

async fn handle_status(persist_dir: &Path, format: OutputFormat) -> i32 {
    let config = PipelineConfig::from_env().with_persist_dir(persist_dir);
    let client = OllamaClient::with_timeout(
        Some(config.ollama_url.clone()),
        Some(config.llm_model.clone()),
        std::time::Duration::from_secs(5),
    );

    let models = client.list_models().await.ok();
    let collections = collection_counts(persist_dir);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "ollama": {
                    "url": config.ollama_url,
                    "reachable": models.is_some(),
                    "models": models.clone().unwrap_or_default(),
                    "embed_model": config.embed_model,
                    "llm_model": config.llm_model,
                },
                "store": {
                    "path": persist_dir.display().to_string(),
                    "exists": collections.is_some(),
                    "collections": collections
                        .iter()
                        .flatten()
                        .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                        .collect::<Vec<_>>(),
                }
            });
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            }
        }
        OutputFormat::Human => {
            println!("Ollama: {}", config.ollama_url);
            match &models {
                Some(models) => {
                    println!("  Reachable, {} models pulled", models.len());
                    for wanted in [&config.embed_model, &config.llm_model] {
                        let mark = if is_model_installed(models, wanted) {
                            "ok"
                        } else {
                            "missing"
                        };
                        println!("    {:<24} {}", wanted, mark);
                    }
                }
                None => println!("  Not reachable (is `ollama serve` running?)"),
            }

            println!("\nVector store: {}", persist_dir.display());
            match &collections {
                Some(collections) if collections.is_empty() => println!("  No collections"),
                Some(collections) => {
                    for (name, count) in collections {
                        println!("    {:<24} {} chunks", name, count);
                    }
                }
                None => println!("  Not built (run `boardrag build-index`)"),
            }
        }
    }
    0
}

fn collection_counts(persist_dir: &Path) -> Option<Vec<(String, usize)>> {
    let store = VectorStore::open_existing(persist_dir).ok()?;
    let names = store.list_collections().ok()?;
    Some(
        names
            .into_iter()
            .map(|name| {
                let count = store.count(&name).unwrap_or(0);
                (name, count)
            })
            .collect(),
    )
}
