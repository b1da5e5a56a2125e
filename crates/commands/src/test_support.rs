use std::sync::Arc;

use async_trait::async_trait;
use hbot_slack::{ApiError, MessageSender, OutboundMessage};
use tokio::sync::Mutex;

use crate::command::{Command, CommandError, CommandInvocation};

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    fail_with: Option<String>,
}

impl RecordingSender {
    pub fn failing(code: &str) -> Self {
        Self { sent: Mutex::new(Vec::new()), fail_with: Some(code.to_owned()) }
    }

    pub async fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(
        &self,
        channel_id: &str,
        message: OutboundMessage,
    ) -> Result<(), ApiError> {
        self.sent.lock().await.push((channel_id.to_owned(), message));
        match &self.fail_with {
            Some(code) => Err(ApiError::Slack(code.clone())),
            None => Ok(()),
        }
    }
}

/// Command with fixed name/help that records every invocation it receives.
pub struct StaticCommand {
    name: String,
    help: String,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

impl StaticCommand {
    pub fn new(name: &str, help: &str) -> Self {
        Self {
            name: name.to_owned(),
            help: help.to_owned(),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn invocations(&self) -> Arc<Mutex<Vec<CommandInvocation>>> {
        Arc::clone(&self.invocations)
    }
}

#[async_trait]
impl Command for StaticCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> &str {
        &self.help
    }

    async fn execute(
        &self,
        invocation: &CommandInvocation,
        _bot: &dyn MessageSender,
    ) -> Result<(), CommandError> {
        self.invocations.lock().await.push(invocation.clone());
        Ok(())
    }
}

pub fn invocation(command: &str, arguments: &[&str]) -> CommandInvocation {
    CommandInvocation {
        command: command.to_owned(),
        arguments: arguments.iter().map(|argument| (*argument).to_owned()).collect(),
        user_id: "U1".to_owned(),
        channel_id: "C1".to_owned(),
    }
}
