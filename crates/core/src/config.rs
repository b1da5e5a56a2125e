use std::env;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BOT_NAME: &str = "hbot";
pub const DEFAULT_ICON_URL: &str = "http://i.imgur.com/gLeA41v.jpg";
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub bot: BotConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub name: String,
    pub icon_url: String,
    pub command_prefix: String,
    pub event_queue_capacity: usize,
    pub ignore_bot_messages: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub bot_name: Option<String>,
    pub command_prefix: Option<String>,
    pub ignore_bot_messages: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                app_token: String::new().into(),
                bot_token: String::new().into(),
                api_base_url: DEFAULT_SLACK_API_URL.to_string(),
            },
            bot: BotConfig {
                name: DEFAULT_BOT_NAME.to_string(),
                icon_url: DEFAULT_ICON_URL.to_string(),
                command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
                event_queue_capacity: 64,
                ignore_bot_messages: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Defaults, then environment, then explicit overrides. Validated last.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SLACK_APP_TOKEN") {
            self.slack.app_token = secret_value(value);
        }
        if let Some(value) = read_env("SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("HBOT_SLACK_API_URL") {
            self.slack.api_base_url = value;
        }

        let bot_name = read_env("HBOT_NAME").or_else(|| read_env("H_BOT_NAME"));
        if let Some(value) = bot_name {
            self.bot.name = value;
        }
        if let Some(value) = read_env("HBOT_ICON_URL") {
            self.bot.icon_url = value;
        }
        if let Some(value) = read_env("HBOT_COMMAND_PREFIX") {
            self.bot.command_prefix = value;
        }
        if let Some(value) = read_env("HBOT_EVENT_QUEUE_CAPACITY") {
            self.bot.event_queue_capacity = parse_usize("HBOT_EVENT_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("HBOT_IGNORE_BOT_MESSAGES") {
            self.bot.ignore_bot_messages = parse_bool("HBOT_IGNORE_BOT_MESSAGES", &value)?;
        }

        if let Some(value) = read_env("HBOT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("HBOT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = secret_value(slack_app_token);
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(api_base_url) = overrides.slack_api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(bot_name) = overrides.bot_name {
            self.bot.name = bot_name;
        }
        if let Some(command_prefix) = overrides.command_prefix {
            self.bot.command_prefix = command_prefix;
        }
        if let Some(ignore_bot_messages) = overrides.ignore_bot_messages {
            self.bot.ignore_bot_messages = ignore_bot_messages;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_bot(&self.bot)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let app_token = slack.app_token.expose_secret();
    if app_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.app_token is required (SLACK_APP_TOKEN). Get it from https://api.slack.com/apps > Your App > Basic Information > App-Level Tokens".to_string(),
        ));
    }
    if !app_token.starts_with("xapp-") {
        let hint = if app_token.starts_with("xoxb-") {
            " (hint: you may have used the bot token instead of the app token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.app_token must start with `xapp-`{hint}"
        )));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required (SLACK_BOT_TOKEN). Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string(),
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}"
        )));
    }

    let base_url = slack.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_bot(bot: &BotConfig) -> Result<(), ConfigError> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::Validation("bot.name must not be empty".to_string()));
    }

    if bot.command_prefix.is_empty() {
        return Err(ConfigError::Validation("bot.command_prefix must not be empty".to_string()));
    }

    if bot.event_queue_capacity == 0 {
        return Err(ConfigError::Validation(
            "bot.event_queue_capacity must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
