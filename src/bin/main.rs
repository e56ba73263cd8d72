//! Atlas CLI - sync and inspect the model catalog
//!
//! Usage:
//!   atlas sync-workspace <workspace-id>
//!   atlas context <dataset-id> "<question>" [--query-type <type>]
//!   atlas analytics [--dataset-id <id>] [--window-days <n>]
//!   atlas status

use clap::{Parser, Subcommand};
use serde::Serialize;

use atlas::config::Settings;
use atlas::gateway::RestGateway;
use atlas::store::HistoryFilter;
use atlas::CatalogService;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Metadata catalog and query journal for tabular analytical models")]
#[command(version)]
struct Cli {
    /// Path to a config file (overrides the default search)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every dataset of a workspace into the catalog
    SyncWorkspace { workspace_id: String },

    /// Sync a single dataset
    SyncDataset {
        workspace_id: String,
        dataset_id: String,
    },

    /// Assemble a question-scoped context bundle
    Context {
        dataset_id: String,
        question: String,

        /// Query intent used for rule matching (defaults to "analysis")
        #[arg(long)]
        query_type: Option<String>,
    },

    /// Show a dataset overview
    Dataset { dataset_id: String },

    /// Deep dive on one measure
    Measure {
        dataset_id: String,
        measure_name: String,
    },

    /// Query analytics over a trailing window
    Analytics {
        #[arg(long)]
        dataset_id: Option<String>,

        #[arg(long)]
        window_days: Option<u32>,
    },

    /// Most recent refresh of a dataset, from the platform
    Refresh { dataset_id: String },

    /// Well-rated prior questions for a dataset
    Popular { dataset_id: String },

    /// List recorded queries, most recent first
    History {
        #[arg(long)]
        dataset_id: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Catalog counts and latest sync stamps
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atlas=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    let service: CatalogService<RestGateway> = CatalogService::connect(settings)?;

    match cli.command {
        Commands::SyncWorkspace { workspace_id } => {
            print_json(&service.sync_workspace(&workspace_id).await?)
        }
        Commands::SyncDataset {
            workspace_id,
            dataset_id,
        } => print_json(&service.sync_dataset(&workspace_id, &dataset_id).await?),
        Commands::Context {
            dataset_id,
            question,
            query_type,
        } => print_json(&service.generate_context(&dataset_id, &question, query_type.as_deref())?),
        Commands::Dataset { dataset_id } => print_json(&service.dataset_context(&dataset_id)?),
        Commands::Measure {
            dataset_id,
            measure_name,
        } => print_json(&service.measure_context(&dataset_id, &measure_name)?),
        Commands::Analytics {
            dataset_id,
            window_days,
        } => print_json(&service.compute_analytics(dataset_id.as_deref(), window_days)?),
        Commands::Refresh { dataset_id } => {
            print_json(&service.dataset_refresh(&dataset_id).await?)
        }
        Commands::Popular { dataset_id } => print_json(&service.popular_questions(&dataset_id)?),
        Commands::History { dataset_id, limit } => {
            let filter = HistoryFilter {
                dataset_id,
                limit: limit.or(Some(50)),
                ..Default::default()
            };
            print_json(&service.query_history(&filter)?)
        }
        Commands::Status => print_json(&service.status()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
