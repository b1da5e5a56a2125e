use std::{path::Path, sync::Arc};

use hbot_commands::{
    BangCommand, CoinbaseTickerClient, CommandMessageHandler, CommandRegistry, FedCommand,
    FedDefinition, FedError, HelpCommand, LookupCommand, YahooQuoteClient,
};
use hbot_core::config::{AppConfig, ConfigError};
use hbot_slack::{EventSource, HBot, ReconnectPolicy, SlackWebClient, SocketModeSource};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub bot: HBot,
    pub commands: Arc<CommandRegistry>,
    pub source: Arc<dyn EventSource>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fed(#[from] FedError),
}

/// Wires the Slack client, the command router and the Socket Mode source from
/// an already loaded configuration. Nothing touches the network here.
pub fn bootstrap_with_config(
    config: AppConfig,
    fedfile: Option<&Path>,
) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    config.validate()?;

    let fed = fedfile.map(load_fed).transpose()?;
    let commands = build_registry(fed);

    let client = Arc::new(SlackWebClient::new(
        &config.slack.api_base_url,
        config.slack.bot_token.clone(),
        config.slack.app_token.clone(),
    ));

    let router = CommandMessageHandler::with_registry(
        config.bot.command_prefix.clone(),
        Arc::clone(&commands),
    )
    .ignore_bot_messages(config.bot.ignore_bot_messages);

    let mut bot = HBot::new(client.clone(), config.bot.name.clone(), config.bot.icon_url.clone())
        .with_queue_capacity(config.bot.event_queue_capacity);
    bot.register_handler(router);

    let source: Arc<dyn EventSource> =
        Arc::new(SocketModeSource::new(client, ReconnectPolicy::default()));

    info!(
        event_name = "system.bootstrap.ready",
        bot_name = %config.bot.name,
        prefix = %config.bot.command_prefix,
        commands = commands.len(),
        "application bootstrap complete"
    );

    Ok(Application { config, bot, commands, source })
}

fn load_fed(path: &Path) -> Result<FedDefinition, FedError> {
    let definition = FedDefinition::load(path)?;
    info!(
        event_name = "system.bootstrap.fed_loaded",
        path = %path.display(),
        command = %definition.name,
        phrases = definition.phrases.len(),
        images = definition.images.len(),
        "registering fed command"
    );
    Ok(definition)
}

/// Built-in commands plus the optional fed command. A fed command named like a
/// built-in replaces it, since it is registered last.
pub fn build_registry(fed: Option<FedDefinition>) -> Arc<CommandRegistry> {
    let registry = Arc::new(CommandRegistry::new());
    registry.register(BangCommand);
    registry.register(HelpCommand::new(&registry));
    registry.register(LookupCommand::stocks(Arc::new(YahooQuoteClient::default())));
    registry.register(LookupCommand::crypto(Arc::new(CoinbaseTickerClient::default())));
    if let Some(definition) = fed {
        registry.register(FedCommand::new(definition));
    }
    registry
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use hbot_commands::FedError;
    use hbot_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use hbot_slack::SessionState;

    use super::{bootstrap_with_config, BootstrapError};

    fn config() -> AppConfig {
        AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .expect("config with valid tokens")
    }

    fn registered_names(app: &super::Application) -> Vec<String> {
        let mut names: Vec<String> =
            app.commands.describe().into_iter().map(|(name, _)| name).collect();
        names.sort();
        names
    }

    #[test]
    fn registers_built_in_commands_behind_one_router() {
        let app = bootstrap_with_config(config(), None).expect("bootstrap");

        assert_eq!(registered_names(&app), vec!["bang", "crypto", "help", "stocks"]);
        assert_eq!(app.bot.handler_count(), 1);
        assert_eq!(app.bot.state(), SessionState::Created);
    }

    #[test]
    fn fed_file_adds_a_command() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"name":"fed","help":"fed speak","phrases":["a"],"images":[]}}"#)
            .expect("write");

        let app = bootstrap_with_config(config(), Some(file.path())).expect("bootstrap");

        assert!(registered_names(&app).contains(&"fed".to_string()));
        let fed = app.commands.get("fed").expect("fed registered");
        assert_eq!(fed.help(), "fed speak");
    }

    #[test]
    fn unreadable_fed_file_aborts_startup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("fed.json");

        let result = bootstrap_with_config(config(), Some(missing.as_path()));

        let error = result.err().expect("missing fed file should fail");
        assert!(matches!(error, BootstrapError::Fed(FedError::Read { .. })));
        assert!(error.to_string().contains("fed.json"));
    }

    #[test]
    fn invalid_config_is_rejected_before_wiring() {
        let mut config = config();
        config.bot.command_prefix.clear();

        let result = bootstrap_with_config(config, None);

        let message = result.err().expect("empty prefix should fail").to_string();
        assert!(message.contains("bot.command_prefix"));
    }
}
