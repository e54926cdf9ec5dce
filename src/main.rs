//! Civicpulse - Citizen Feedback Aggregation Service
//!
//! This is the main entry point for the civicpulse service: the HTTP API
//! plus a handful of operational commands (database init, one-off
//! classification, issue listing, stalled-batch recovery).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use civicpulse::{
    api::{ApiServer, ApiServerConfig},
    classifier, FeedbackStore, LibsqlStorage, Pipeline, Settings,
};

#[derive(Parser)]
#[command(name = "civicpulse", version, about = "Citizen feedback aggregation service")]
struct Cli {
    /// Database path (overrides config and CIVICPULSE_DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Listen address (host:port)
        #[arg(long)]
        addr: Option<String>,

        /// Submissions per batch before analysis triggers
        #[arg(long)]
        batch_limit: Option<u32>,
    },

    /// Create the database and schema
    Init,

    /// Classify a single feedback text and print the annotation
    Classify {
        /// Raw feedback text, possibly mixed-language
        text: String,
    },

    /// Print global issues, highest priority first
    Issues,

    /// Re-run analysis for batches stuck in processing
    Recover,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("civicpulse=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.database_path = db;
    }

    match cli.command {
        Command::Serve { addr, batch_limit } => {
            if let Some(addr) = addr {
                settings.listen_addr = addr;
            }
            if let Some(limit) = batch_limit {
                settings.batch_limit = limit;
            }
            serve(settings).await
        }
        Command::Init => {
            LibsqlStorage::connect(&settings.database_path).await?;
            println!("Database initialized at {}", settings.database_path);
            Ok(())
        }
        Command::Classify { text } => {
            let language = classifier::detect_language(&text);
            let annotation = classifier::annotate(&text);
            println!("language:   {}", language.as_str());
            println!("category:   {}", annotation.category);
            println!("priority:   {}", annotation.priority);
            println!("main issue: {}", annotation.main_issue);
            println!("summary:    {}", annotation.summary);
            Ok(())
        }
        Command::Issues => {
            let store = LibsqlStorage::connect(&settings.database_path).await?;
            let issues = store.list_global_issues().await?;
            if issues.is_empty() {
                println!("No global issues recorded yet.");
                return Ok(());
            }
            for issue in issues {
                println!(
                    "[{:>8}] {:>4} reports  {} - {}",
                    issue.priority, issue.total_reports, issue.category, issue.issue_text
                );
            }
            Ok(())
        }
        Command::Recover => {
            let store = Arc::new(LibsqlStorage::connect(&settings.database_path).await?);
            let pipeline = Pipeline::new(store, settings.batch_limit);
            let recovered = pipeline.recover_stalled().await?;
            println!("Recovered {} stalled batch(es)", recovered);
            Ok(())
        }
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    info!(
        db = %settings.database_path,
        batch_limit = settings.batch_limit,
        "starting civicpulse"
    );

    let store = Arc::new(LibsqlStorage::connect(&settings.database_path).await?);
    let pipeline = Arc::new(Pipeline::new(store, settings.batch_limit));

    let config = ApiServerConfig {
        addr: settings.listen_addr.parse()?,
    };
    ApiServer::new(config, pipeline).serve().await
}
