//! Explorer CLI Entry Point

use clap::Parser;
use explorer_cli::{handler, logging, Cli};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = logging::init_logging(config.log_level, config.log_format) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = handler::run(cli, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
