mod analyzer;
mod config;
mod dashboard;
mod model;
mod normalizer;
mod parser;
mod session;
mod source;
mod utils;

use config::load_config;
use session::run_session;
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.json";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::var("FLORIT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("🚀 Restock session started ({:?} mode)", config.mode);

    let report = match run_session(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("Session failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = dashboard::render(&report, io::stdout().lock()) {
        error!("Failed to write dashboard: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Session finished");
    ExitCode::SUCCESS
}
