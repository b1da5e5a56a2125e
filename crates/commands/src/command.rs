use async_trait::async_trait;
use hbot_slack::{ApiError, MessageSender};
use thiserror::Error;

/// One parsed invocation of a command, as seen by the command itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: String,
    pub arguments: Vec<String>,
    pub user_id: String,
    pub channel_id: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("reply could not be sent: {0}")]
    Send(#[from] ApiError),
    #[error("command registry is no longer available")]
    RegistryUnavailable,
}

/// A named unit of behavior triggered by a prefixed chat message.
///
/// Commands may be invoked concurrently; any mutable state must carry its own
/// synchronization.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn help(&self) -> &str;
    async fn execute(
        &self,
        invocation: &CommandInvocation,
        bot: &dyn MessageSender,
    ) -> Result<(), CommandError>;
}
