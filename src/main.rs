use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skyfeed::commands;
use skyfeed::config::Config;
use skyfeed::db;

#[derive(Parser)]
#[command(name = "skyfeed")]
#[command(about = "Live aircraft state-vector ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll configured providers and fan out to NATS and Postgres
    Run,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url)?;
    db::run_migrations(&pool).context("Database migration failed")?;

    match cli.command {
        Commands::Run => commands::handle_run(config, pool).await,
        Commands::Migrate => {
            info!("Database migrations are up to date");
            Ok(())
        }
    }
}
