use std::sync::Arc;

use async_trait::async_trait;
use hbot_slack::{
    EventHandler, HandlerError, HandlerResult, MessageEvent, MessageSender, SessionEvent,
};
use tracing::{debug, info, warn};

use crate::{
    command::{Command, CommandInvocation},
    registry::CommandRegistry,
};

/// What the router did with one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    NotACommand,
    IgnoredBotMessage,
    Empty,
    UnknownCommand(String),
    Executed(String),
    Failed { command: String, error: String },
}

/// Event handler that turns prefixed messages into command invocations.
pub struct CommandMessageHandler {
    prefix: String,
    registry: Arc<CommandRegistry>,
    ignore_bot_messages: bool,
}

impl CommandMessageHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_registry(prefix, Arc::new(CommandRegistry::new()))
    }

    pub fn with_registry(prefix: impl Into<String>, registry: Arc<CommandRegistry>) -> Self {
        Self { prefix: prefix.into(), registry, ignore_bot_messages: false }
    }

    /// Skip messages posted by bots (including this one) before parsing.
    pub fn ignore_bot_messages(mut self, ignore: bool) -> Self {
        self.ignore_bot_messages = ignore;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn register_command<C>(&self, command: C)
    where
        C: Command + 'static,
    {
        self.registry.register(command);
    }

    pub async fn route(&self, event: &SessionEvent, bot: &dyn MessageSender) -> RouteOutcome {
        let SessionEvent::Message(message) = event else {
            return RouteOutcome::NotACommand;
        };
        let Some(tokens) = parse_command_text(&self.prefix, &message.text) else {
            return RouteOutcome::NotACommand;
        };

        if self.ignore_bot_messages && message.is_from_bot() {
            debug!(channel_id = %message.channel_id, "ignoring command from bot message");
            return RouteOutcome::IgnoredBotMessage;
        }

        info!(
            event_name = "command.received",
            channel_id = %message.channel_id,
            user_id = %message.user_id,
            text = %message.text,
            "received command message"
        );

        let Some((name, arguments)) = tokens.split_first() else {
            warn!(text = %message.text, "command text produced no tokens");
            return RouteOutcome::Empty;
        };

        let Some(command) = self.registry.get(name) else {
            debug!(command = %name, "no command registered under name");
            return RouteOutcome::UnknownCommand((*name).to_owned());
        };

        let invocation = invocation_for(message, name, arguments);
        match command.execute(&invocation, bot).await {
            Ok(()) => RouteOutcome::Executed(invocation.command),
            Err(error) => {
                warn!(
                    event_name = "command.failed",
                    command = %invocation.command,
                    channel_id = %invocation.channel_id,
                    error = %error,
                    "command execution failed"
                );
                RouteOutcome::Failed { command: invocation.command, error: error.to_string() }
            }
        }
    }
}

#[async_trait]
impl EventHandler for CommandMessageHandler {
    async fn on_event(
        &self,
        event: &SessionEvent,
        bot: &dyn MessageSender,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(match self.route(event, bot).await {
            RouteOutcome::NotACommand
            | RouteOutcome::IgnoredBotMessage
            | RouteOutcome::Empty
            | RouteOutcome::UnknownCommand(_) => HandlerResult::Ignored,
            RouteOutcome::Executed(_) | RouteOutcome::Failed { .. } => HandlerResult::Processed,
        })
    }
}

/// Strips `prefix` and splits on single spaces. Consecutive spaces yield empty
/// tokens; they are kept so argument positions stay as typed.
pub fn parse_command_text<'a>(prefix: &str, text: &'a str) -> Option<Vec<&'a str>> {
    text.strip_prefix(prefix).map(|rest| rest.split(' ').collect())
}

fn invocation_for(message: &MessageEvent, name: &str, arguments: &[&str]) -> CommandInvocation {
    CommandInvocation {
        command: name.to_owned(),
        arguments: arguments.iter().map(|argument| (*argument).to_owned()).collect(),
        user_id: message.user_id.clone(),
        channel_id: message.channel_id.clone(),
    }
}
