mod cli;
mod commands;
mod config;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use config::{AdminConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Configuration ---
    let config = AdminConfig::from_env()?;
    init_tracing(config.log_format, cli.debug);
    tracing::debug!(?config, "Loaded admin configuration");

    // --- Database ---
    let database_url = cli
        .database_url
        .clone()
        .context("DATABASE_URL must be set")?;
    let pool = vellum_db::create_pool(&database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    vellum_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database connection pool created");

    let output = commands::run(cli.command, pool, config.engine).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(format: LogFormat, debug: bool) {
    let default_filter = if debug {
        "vellum_admin=debug,vellum_engine=debug,vellum_db=debug"
    } else {
        "vellum_admin=info,vellum_engine=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
