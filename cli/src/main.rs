mod config;
mod gemini;
mod server;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::gemini::GeminiClient;
use pantry_core::service::PantryService;

const DEFAULT_LOG_FILTER: &str = "pantry=info,pantry_core=info,tower_http=info";

#[derive(Parser)]
#[command(
    name = "pantry",
    version,
    about = "Pantry inventory, recipes and shopping lists",
    long_about = "Track what is in the pantry, keep a recipe collection (including \
                  AI-generated recipes) and build shopping lists from recipes and \
                  low-stock items."
)]
struct Cli {
    /// SQLite database file (overrides DATABASE_URL)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Print the dashboard summary as JSON
    Summary,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?.with_db_path(cli.db);
    info!(path = %config.db_path.display(), "opening database");
    let service = PantryService::open(&config.db_path)?;

    match cli.command {
        Commands::Serve { port, bind } => {
            let gemini = config
                .gemini_api_key
                .as_deref()
                .map(|key| GeminiClient::new(key, config.gemini_model.as_str(), config.ai_timeout))
                .transpose()?;
            server::start_server(service, gemini, port, &bind).await
        }
        Commands::Summary => {
            let summary = service.home_summary(chrono::Local::now().date_naive())?;
            let json =
                serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
            println!("{json}");
            Ok(())
        }
    }
}
