use clap::Parser;
use one_api_rust::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and friends apply before the config is read
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = one_api_rust::config::config();

    if let Err(e) = one_api_rust::cli::run(cli, config).await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }

    Ok(())
}
