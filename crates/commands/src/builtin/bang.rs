use async_trait::async_trait;
use hbot_slack::{MessageSender, OutboundMessage};

use crate::command::{Command, CommandError, CommandInvocation};

/// Liveness check: replies `bang`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BangCommand;

#[async_trait]
impl Command for BangCommand {
    fn name(&self) -> &str {
        "bang"
    }

    fn help(&self) -> &str {
        "health check"
    }

    async fn execute(
        &self,
        invocation: &CommandInvocation,
        bot: &dyn MessageSender,
    ) -> Result<(), CommandError> {
        bot.send_message(&invocation.channel_id, OutboundMessage::text("bang")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BangCommand;
    use crate::{
        command::{Command, CommandError},
        test_support::{invocation, RecordingSender},
    };

    #[tokio::test]
    async fn replies_bang_exactly_once() {
        let sender = RecordingSender::default();

        BangCommand.execute(&invocation("bang", &["ignored"]), &sender).await.expect("bang");

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "C1");
        assert_eq!(sent[0].1.text, "bang");
        assert!(sent[0].1.attachments.is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let sender = RecordingSender::failing("channel_not_found");

        let error = BangCommand.execute(&invocation("bang", &[]), &sender).await;

        assert!(matches!(error, Err(CommandError::Send(_))));
    }
}
