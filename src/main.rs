use clap::Parser;
use device_registry::api::server::DeviceServer;
use device_registry::cli::Cli;
use device_registry::config::ServerConfig;
use device_registry::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() {
    // Parse CLI arguments first to get logging configuration
    let cli = Cli::parse();

    let log_config = LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json)
        .with_file_output(cli.log_file.clone());

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Device registry failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?.with_overrides(cli.host, cli.port, cli.heartbeat_secs);

    DeviceServer::new(config).run().await
}
