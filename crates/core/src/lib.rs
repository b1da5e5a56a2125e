//! Shared runtime configuration for hbot.
//!
//! Every setting comes from the process environment; there is no config file.

pub mod config;

pub use config::{
    AppConfig, BotConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig,
    SlackConfig,
};
