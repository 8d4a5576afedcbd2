use anyhow::Result;
use clap::Parser;
use wastore::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();
    // `init` must work even when the existing config is broken
    let config = match cli::load_config(cli_args.config.as_deref()) {
        Ok(config) => config,
        Err(_) if matches!(cli_args.command, Some(cli::Commands::Init { .. })) => {
            wastore::config::Config::default()
        }
        Err(e) => return Err(e),
    };

    let mut log_config = logging::LogConfig::new()
        .with_debug_mode(cli_args.debug)
        .with_level(config.logging.level.clone())
        .with_json(config.logging.json);
    if let Some(dir) = &config.logging.file {
        log_config = log_config.with_log_dir(dir.clone());
    }

    let _guard = logging::init_logging(log_config.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Keep the last 7 days of rolled files
    if cli_args.debug
        && let Ok(removed) = log_config.cleanup_old_logs(7)
        && removed > 0
    {
        tracing::info!("Cleaned up {} old log file(s)", removed);
    }

    cli::run(cli_args, &config).await
}
