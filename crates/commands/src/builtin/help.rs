use std::sync::{Arc, Weak};

use async_trait::async_trait;
use hbot_slack::{MessageSender, OutboundMessage};

use crate::{
    command::{Command, CommandError, CommandInvocation},
    registry::CommandRegistry,
};

/// Lists every registered command as `name: help`, one per line.
///
/// Holds a weak reference so the registry it is registered into does not keep
/// itself alive.
pub struct HelpCommand {
    registry: Weak<CommandRegistry>,
}

impl HelpCommand {
    pub fn new(registry: &Arc<CommandRegistry>) -> Self {
        Self { registry: Arc::downgrade(registry) }
    }

    fn render(registry: &CommandRegistry) -> String {
        registry.describe().into_iter().map(|(name, help)| format!("{name}: {help}\n")).collect()
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn help(&self) -> &str {
        "this"
    }

    async fn execute(
        &self,
        invocation: &CommandInvocation,
        bot: &dyn MessageSender,
    ) -> Result<(), CommandError> {
        let registry = self.registry.upgrade().ok_or(CommandError::RegistryUnavailable)?;
        let listing = Self::render(&registry);
        bot.send_message(&invocation.channel_id, OutboundMessage::text(listing)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::HelpCommand;
    use crate::{
        command::{Command, CommandError},
        registry::CommandRegistry,
        test_support::{invocation, RecordingSender, StaticCommand},
    };

    #[tokio::test]
    async fn lists_every_registered_command() {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(StaticCommand::new("bang bang", "health check"));
        registry.register(StaticCommand::new("stocks", "ticker quotes"));
        let help = HelpCommand::new(&registry);
        let sender = RecordingSender::default();

        help.execute(&invocation("help", &[]), &sender).await.expect("help");

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        let listing = &sent[0].1.text;
        assert!(listing.contains("bang bang: health check\n"));
        assert!(listing.contains("stocks: ticker quotes\n"));
        assert_eq!(listing.lines().count(), 2);
    }

    #[tokio::test]
    async fn includes_itself_and_later_registrations() {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(HelpCommand::new(&registry));
        registry.register(StaticCommand::new("crypto", "first"));
        registry.register(StaticCommand::new("crypto", "Coinbase crypto prices"));
        let help = registry.get("help").expect("help registered");
        let sender = RecordingSender::default();

        help.execute(&invocation("help", &[]), &sender).await.expect("help");

        let listing = sender.sent().await[0].1.text.clone();
        assert!(listing.contains("help: this\n"));
        assert!(listing.contains("crypto: Coinbase crypto prices\n"));
        assert!(!listing.contains("crypto: first"));
    }

    #[tokio::test]
    async fn dropped_registry_is_an_error_and_sends_nothing() {
        let registry = Arc::new(CommandRegistry::new());
        let help = HelpCommand::new(&registry);
        drop(registry);
        let sender = RecordingSender::default();

        let result = help.execute(&invocation("help", &[]), &sender).await;

        assert!(matches!(result, Err(CommandError::RegistryUnavailable)));
        assert!(sender.sent().await.is_empty());
    }
}
