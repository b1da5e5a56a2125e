use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiError, ChatApi},
    events::{EventHandler, SessionEvent},
    message::{OutboundMessage, PostMessage},
    socket::EventSource,
};

pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

/// Send capability handed to event handlers and commands.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        channel_id: &str,
        message: OutboundMessage,
    ) -> Result<(), ApiError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Connecting,
    Running,
    Terminated(TerminationReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    Normal,
    AuthFailure,
    ProtocolError,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("event source rejected authentication: {0}")]
    AuthFailure(String),
    #[error("event source protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    fn termination_reason(&self) -> TerminationReason {
        match self {
            Self::AuthFailure(_) => TerminationReason::AuthFailure,
            Self::Protocol(_) => TerminationReason::ProtocolError,
        }
    }
}

pub struct HBot {
    api: Arc<dyn ChatApi>,
    handlers: Vec<Arc<dyn EventHandler>>,
    bot_name: String,
    icon_url: String,
    queue_capacity: usize,
    state: Mutex<SessionState>,
}

impl HBot {
    pub fn new(
        api: Arc<dyn ChatApi>,
        bot_name: impl Into<String>,
        icon_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            handlers: Vec::new(),
            bot_name: bot_name.into(),
            icon_url: icon_url.into(),
            queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            state: Mutex::new(SessionState::Created),
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn register_handler<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = ?*state, to = ?next, "session state transition");
        *state = next;
    }

    /// Starts `source` on a background task and consumes its events one at a
    /// time until the queue closes or a fatal event arrives.
    ///
    /// A command that never returns stalls every later event; nothing here
    /// imposes a deadline.
    pub async fn run(&self, source: Arc<dyn EventSource>) -> Result<(), SessionError> {
        self.set_state(SessionState::Connecting);
        info!(
            event_name = "session.connecting",
            bot_name = %self.bot_name,
            handlers = self.handlers.len(),
            "starting event source"
        );

        let (sender, mut receiver) = mpsc::channel(self.queue_capacity);
        let mut connection = tokio::spawn(async move { source.manage_connection(sender).await });
        self.set_state(SessionState::Running);

        let result = loop {
            let Some(event) = receiver.recv().await else {
                // The queue also closes when the source task dies mid-flight.
                break match (&mut connection).await {
                    Err(join_error) if join_error.is_panic() => {
                        error!(
                            event_name = "session.source_panicked",
                            error = %join_error,
                            "event source task panicked"
                        );
                        Err(SessionError::Protocol("event source panicked".to_owned()))
                    }
                    _ => {
                        info!(event_name = "session.source_closed", "event source closed");
                        Ok(())
                    }
                };
            };
            debug!(event_type = event.event_type(), "received session event");

            match event {
                SessionEvent::AuthFailure { reason } => {
                    error!(
                        event_name = "session.auth_failure",
                        reason = %reason,
                        "authentication rejected"
                    );
                    break Err(SessionError::AuthFailure(reason));
                }
                SessionEvent::ProtocolError { reason } => {
                    error!(
                        event_name = "session.protocol_error",
                        reason = %reason,
                        "protocol error"
                    );
                    break Err(SessionError::Protocol(reason));
                }
                event => self.dispatch(&event).await,
            }
        };

        connection.abort();
        let reason = match &result {
            Ok(()) => TerminationReason::Normal,
            Err(error) => error.termination_reason(),
        };
        self.set_state(SessionState::Terminated(reason));
        info!(event_name = "session.terminated", reason = ?reason, "session terminated");

        result
    }

    /// Hands `event` to every handler in registration order. A failing or
    /// panicking handler is logged and the rest still see the event.
    pub async fn dispatch(&self, event: &SessionEvent) {
        for (index, handler) in self.handlers.iter().enumerate() {
            let outcome = AssertUnwindSafe(handler.on_event(event, self)).catch_unwind().await;
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    warn!(
                        handler_index = index,
                        event_type = event.event_type(),
                        error = %error,
                        "event handler failed; continuing dispatch"
                    );
                }
                Err(_) => {
                    error!(
                        handler_index = index,
                        event_type = event.event_type(),
                        "event handler panicked; continuing dispatch"
                    );
                }
            }
        }
    }
}

#[async_trait]
impl MessageSender for HBot {
    async fn send_message(
        &self,
        channel_id: &str,
        message: OutboundMessage,
    ) -> Result<(), ApiError> {
        let body = PostMessage::new(channel_id, message, &self.bot_name, &self.icon_url);
        let result = self.api.post_message(&body).await;
        if let Err(error) = &result {
            warn!(
                event_name = "egress.slack.send_failed",
                channel_id = %channel_id,
                error = %error,
                "failed to send message"
            );
        }
        result
    }
}
