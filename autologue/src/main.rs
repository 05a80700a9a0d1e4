//! Command-line entry point of the catalogue enrichment runner.

use autologue::catalogue::{self, CleanTarget};
use autologue::errors::CliError;
use autologue::refresh::refresh_if_stale;
use autologue::runner::{connect_memory, enrich_families, perplexity_for, select_families};
use autologue_enrichment::prelude::{Ledger, PipelineConfig};
use autologue_perplexity::PerplexityConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalogue root holding the family directories and prompt files
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Restrict the command to one family
    #[arg(long, global = true)]
    family: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh stale data, research every family, then concatenate (default)
    Run {
        /// Perplexity model
        #[arg(long)]
        model: Option<String>,
        /// Completion budget per query
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Retry ceiling per record
        #[arg(long, default_value_t = 4)]
        max_retries: u32,
        /// Knowledge-graph bridge URL (default: $AUTOLOGUE_BRIDGE_URL, then ngrok)
        #[arg(long)]
        bridge_url: Option<String>,
        /// Do not offer memory tools to the model
        #[arg(long)]
        no_memory: bool,
    },
    /// Empty the family ledgers
    Reset,
    /// Remove generated files
    Clean {
        /// What to remove
        #[arg(value_enum)]
        target: CleanTarget,
    },
    /// Concatenate outputs and errors into the catalogue directory
    Concat,
    /// Copy exported category tables into the family inputs
    Distribute {
        /// Directory holding the exported `output_<category>.tsv` tables
        export_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let families = select_families(cli.family.as_deref())?;
    let root = cli.root;

    match cli.command.unwrap_or(Commands::Run {
        model: None,
        max_tokens: None,
        max_retries: 4,
        bridge_url: None,
        no_memory: false,
    }) {
        Commands::Run {
            model,
            max_tokens,
            max_retries,
            bridge_url,
            no_memory,
        } => {
            let now = chrono::Local::now().naive_local();
            if let Err(err) = refresh_if_stale(&root, &families, now) {
                tracing::error!(%err, "Failed to read info file");
            }

            let mut config = PerplexityConfig::from_env()?;
            if let Some(model) = model {
                config = config.with_model(model);
            }
            if let Some(max_tokens) = max_tokens {
                config = config.with_max_tokens(max_tokens);
            }
            let memory = if no_memory {
                None
            } else {
                connect_memory(bridge_url.as_deref()).await
            };

            let pipeline_config = PipelineConfig::default().with_max_retries(max_retries);
            enrich_families(&families, &root, pipeline_config, |family| {
                perplexity_for(family, &root, &config, memory.as_ref())
            })
            .await;

            catalogue::concat(&root, &families)?;
        }
        Commands::Reset => {
            for family in &families {
                Ledger::empty(family.layout(&root).ledger()).reset()?;
                tracing::info!(family = family.name, "Ledger reset");
            }
        }
        Commands::Clean { target } => {
            let count = catalogue::clean(&root, &families, target)?;
            tracing::info!(?target, count, "Clean complete");
        }
        Commands::Concat => {
            catalogue::concat(&root, &families)?;
        }
        Commands::Distribute { export_dir } => {
            let count = catalogue::distribute(&export_dir, &root)?;
            tracing::info!(count, "Copied files for processing");
        }
    }

    Ok(())
}
