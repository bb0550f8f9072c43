use anyhow::Result;
use inference_gateway::{config, server};
use tracing::info;

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = config.server.logs.level.clone();
    if let Err(e) = validate_log_level(&log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // RUST_LOG, when set, takes precedence over the configured level
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(&log_level)?,
    };

    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!(
        "Starting inference gateway ({:?}) with log level: {}",
        config.gateway, log_level
    );

    server::run(config).await?;

    Ok(())
}
