use clap::Parser;
use tracing::{error, info};

use updown::cli::{self, Cli, Commands};
use updown::config::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    let config = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    match args.command {
        Commands::Run => {
            config.init_logging();
            info!("updown starting");
            if let Err(e) = cli::run_loop(config).await {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
            info!("updown stopped");
        }
        Commands::Once { json } => {
            if !json {
                config.init_logging();
            }
            if let Err(e) = cli::run_once(config, json).await {
                eprintln!("Settlement cycle failed: {e}");
                std::process::exit(1);
            }
        }
        Commands::Markets { json } => {
            if let Err(e) = cli::list_markets(&config, json) {
                eprintln!("Failed to list markets: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            cli::check_config(&config);
        }
    }
}
