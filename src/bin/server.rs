//! Mediator server entry point.
//!
//! Run with: cargo run --bin neuroevolution-server -- --config config.yaml

use clap::Parser;
use neuroevolution::{web::run_server, Config};
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "neuroevolution-server")]
#[command(about = "Serves evolving mediator networks to clients and collects their evaluations")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Address to bind the server to (defaults to host:port from the config)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.log_level.as_str())).init();
    log::info!("Configuration: {}", args.config);

    let bind = args.bind.unwrap_or_else(|| config.bind_address());
    let bind: SocketAddr = bind
        .parse()
        .map_err(|e| format!("Invalid bind address '{}': {}", bind, e))?;

    run_server(config, bind).await
}

/// Load configuration from file, falling back to defaults when it does not exist
fn load_config(config_path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    if std::path::Path::new(config_path).exists() {
        return Config::from_file(config_path);
    }
    eprintln!("{} not found, using default configuration", config_path);
    Ok(Config::default())
}
