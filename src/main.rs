use clap::Parser;
use package_indexer::config::IndexerConfig;
use package_indexer::error::Result;
use package_indexer::service::server::Server;
use package_indexer::utils::logging::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Dependency-aware package index server
#[derive(Parser, Debug)]
#[command(name = "package-indexer", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080 (overrides the configuration)
    #[arg(short, long, value_name = "HOST:PORT")]
    address: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", IndexerConfig::example_config());
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("package-indexer: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(path) => IndexerConfig::from_file(path)?,
        None => IndexerConfig::default(),
    };
    config.apply_env()?;
    if let Some(address) = cli.address {
        config.server.address = address;
    }
    config.validate_strict()?;

    init_logging(&config.logging)?;

    let server = Server::bind(config.server).await?;
    info!(address = %server.local_addr()?, "Listening at");
    server.run().await
}
