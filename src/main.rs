//! toolturn binary entry point.

use clap::Parser;
use toolturn::cli::{Cli, Commands};
use toolturn::config::TurnConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("toolturn=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match TurnConfig::load() {
        Ok(config) => match cli.command {
            Commands::Chat(args) => toolturn::cli::handle_chat(config, args).await,
            Commands::Serve(args) => toolturn::cli::handle_serve(config, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
