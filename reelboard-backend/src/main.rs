use std::path::PathBuf;

use clap::Parser;
use reelboard_backend::{build_state, config, log_bridge, server};

#[derive(Parser)]
#[command(name = "reelboard-backend", about = "Reelboard column sync API", version)]
struct Cli {
    /// Config file (defaults to <config_dir>/reelboard/server.json)
    #[arg(short, long, env = "REELBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the config file and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for user documents and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let mut config = config::load_config(&config_path);
    config.apply_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let data_dir = config.resolved_data_dir();
    match log_bridge::init(&data_dir) {
        Ok(path) => log::info!("[reelboard.backend] Logging to {}", path.display()),
        Err(e) => eprintln!("error: failed to initialize logger: {}", e),
    }
    log::info!("[reelboard.backend] Config: {}", config_path.display());

    let state = match build_state(config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("[reelboard.backend] Cannot open document store: {}", e);
            std::process::exit(1);
        }
    };

    let running = match server::spawn_server(state).await {
        Ok(running) => running,
        Err(e) => {
            log::error!("[reelboard.backend] Failed to start HTTP server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[reelboard.backend] Cannot listen for shutdown signal: {}", e);
        running.wait().await;
        return;
    }
    log::info!("[reelboard.backend] Shutting down gracefully");
    running.shutdown().await;
}
