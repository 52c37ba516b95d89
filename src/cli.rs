use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::app::{self, AppContext};
use crate::config::AppConfig;
use crate::database::MemoryStore;
use crate::openapi::{self, Format};
use crate::session::MemorySessionStore;

#[derive(Parser)]
#[command(name = "one-api-rust")]
#[command(about = "Generic resource API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print the API document without starting the server")]
    Spec {
        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: Format,

        #[arg(long, short, help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
    },
}

pub async fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Spec { format, output } => spec(config, format, output),
    }
}

async fn serve(config: &AppConfig) -> Result<()> {
    info!("Starting {} in {:?} mode", config.server.name, config.environment);

    let ctx = AppContext::connect(config).await?;
    let router = app::router(&ctx, config)?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(
        "Listening on http://{}{}",
        bind_addr, config.server.api_prefix
    );
    axum::serve(listener, router).await.context("server error")
}

fn spec(config: &AppConfig, format: Format, output: Option<PathBuf>) -> Result<()> {
    // Documentation never touches storage
    let ctx = AppContext::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySessionStore::new()),
        config,
    );
    let rendered = openapi::render(&app::document(&ctx, config)?, format)?;

    match output {
        Some(path) => std::fs::write(&path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}
