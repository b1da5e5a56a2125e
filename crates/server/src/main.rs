mod bootstrap;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use hbot_core::config::{AppConfig, LoadOptions};
use hbot_slack::SessionError;

#[derive(Debug, Parser)]
#[command(name = "hbot", about = "Slack chat bot with prefixed commands")]
struct Cli {
    #[arg(long, value_name = "PATH", help = "JSON file defining the fed command")]
    fedfile: Option<PathBuf>,
}

fn init_logging(config: &AppConfig) {
    use hbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    // Logging depends on config, so config errors surface through anyhow only.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config, cli.fedfile.as_deref())?;

    tracing::info!(
        event_name = "system.server.started",
        bot_name = %app.bot.bot_name(),
        prefix = %app.config.bot.command_prefix,
        commands = app.commands.len(),
        "hbot started"
    );

    tokio::select! {
        result = app.bot.run(app.source.clone()) => report_session_end(result)?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!(event_name = "system.server.stopping", "shutdown signal received");
        }
    }

    Ok(())
}

fn report_session_end(result: Result<(), SessionError>) -> Result<()> {
    match result {
        Ok(()) => {
            tracing::warn!(
                event_name = "system.server.session_closed",
                "event stream ended without an error"
            );
            Ok(())
        }
        Err(error) => {
            tracing::error!(
                event_name = "system.server.session_failed",
                error = %error,
                "session terminated"
            );
            Err(error.into())
        }
    }
}
