use async_trait::async_trait;
use thiserror::Error;

use crate::bot::MessageSender;

/// A chat message delivered by the event source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub subtype: Option<String>,
    pub bot_id: Option<String>,
}

impl MessageEvent {
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            subtype: None,
            bot_id: None,
        }
    }

    /// True when the message was posted by a bot, including this one.
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Message(MessageEvent),
    AuthFailure { reason: String },
    ProtocolError { reason: String },
    Other { event_type: String },
}

impl SessionEvent {
    pub fn event_type(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::AuthFailure { .. } => "auth_failure",
            Self::ProtocolError { .. } => "protocol_error",
            Self::Other { event_type } => event_type,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthFailure { .. } | Self::ProtocolError { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("event handler failure: {0}")]
    Failed(String),
}

/// Receives every non-fatal event the session consumes, in arrival order.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(
        &self,
        event: &SessionEvent,
        bot: &dyn MessageSender,
    ) -> Result<HandlerResult, HandlerError>;
}
