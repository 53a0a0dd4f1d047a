use anyhow::{Context, Result};
use bookdigest_batch::BatchOrchestrator;
use bookdigest_common::{logger, AppConfig, Strategy, SummaryConfig};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

mod backends;

#[derive(Parser)]
#[command(name = "bookdigest")]
#[command(about = "BookDigest - batch summarization of long-form text", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a JSON array of texts (strings or nulls)
    Summarize {
        /// Input file
        #[arg(long)]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Summarization strategy: direct, hybrid or prompt
        #[arg(long)]
        strategy: Option<Strategy>,

        /// Minimum summary length
        #[arg(long)]
        min_length: Option<usize>,

        /// Maximum summary length
        #[arg(long)]
        max_length: Option<usize>,

        /// Rows processed at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Validate configuration and check backend connectivity
    Check,
}

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Default)]
struct SummaryOverrides {
    strategy: Option<Strategy>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    concurrency: Option<usize>,
}

impl SummaryOverrides {
    fn apply(self, summary: &mut SummaryConfig) {
        if let Some(strategy) = self.strategy {
            summary.strategy = strategy;
        }
        if let Some(min_length) = self.min_length {
            summary.min_length = min_length;
        }
        if let Some(max_length) = self.max_length {
            summary.max_length = max_length;
        }
        if let Some(concurrency) = self.concurrency {
            summary.concurrency = concurrency;
        }
    }
}

/// Parse the input column: a JSON array of strings or nulls
fn parse_documents(json: &str) -> Result<Vec<Option<String>>> {
    serde_json::from_str(json).context("input must be a JSON array of strings or nulls")
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

async fn summarize(config: AppConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let documents = parse_documents(&raw)?;

    tracing::info!(
        "Loaded {} row(s) from {} - Strategy: {}",
        documents.len(),
        input.display(),
        config.summary.strategy
    );

    let summarizer = backends::build_summarizer(&config)?;
    let orchestrator = BatchOrchestrator::new(summarizer, config.summary.clone());

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, remaining rows will be skipped");
            cancel.cancel();
        }
    });

    let pb = progress_bar(documents.len());
    let rows = orchestrator
        .run_with_progress(documents, |_| pb.inc(1))
        .await;
    pb.finish_and_clear();

    let rendered: Vec<&str> = rows.iter().map(|row| row.result.render()).collect();
    let json = serde_json::to_string_pretty(&rendered)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Summaries written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn check(config: AppConfig) -> Result<()> {
    println!("Configuration OK - Strategy: {}", config.summary.strategy);

    if config.summary.strategy == Strategy::Prompt {
        let client = backends::chat_client(&config)?;
        let reachable = client.test_connection().await.unwrap_or(false);
        println!("Chat model {}: {}", client.model(), status(reachable));
    } else {
        let ollama = bookdigest_llm::OllamaClient::new(
            config.ollama_base_url.clone(),
            config.ollama_chat_model.clone(),
        )?;
        let reachable = bookdigest_llm::ChatClient::test_connection(&ollama)
            .await
            .unwrap_or(false);
        println!("Ollama at {}: {}", config.ollama_base_url, status(reachable));

        match &config.generator_model_dir {
            Some(dir) => println!(
                "Generator model {}: {}",
                dir.display(),
                status(dir.join("config.json").exists())
            ),
            None => println!("Generator model: not configured"),
        }
    }

    Ok(())
}

fn status(ok: bool) -> &'static str {
    if ok {
        "reachable"
    } else {
        "unavailable"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Summarize {
            input,
            output,
            strategy,
            min_length,
            max_length,
            concurrency,
        } => {
            SummaryOverrides {
                strategy,
                min_length,
                max_length,
                concurrency,
            }
            .apply(&mut config.summary);
            config.validate()?;

            logger::setup_logging(&config.log_dir, &config.log_level)?;
            tracing::info!("BookDigest starting...");

            summarize(config, &input, output.as_deref()).await?;
        }
        Commands::Check => {
            logger::setup_console_logging(&config.log_level)?;
            config.validate()?;
            check(config).await?;
        }
    }

    Ok(())
}
