//! Slack integration - the session core of hbot
//!
//! This crate owns everything between the Slack workspace and the command layer:
//! - **Socket Mode** (`socket`) - `EventSource` that keeps a WebSocket open and feeds events
//! - **Web API** (`api`) - `chat.postMessage` and `apps.connections.open` over HTTPS
//! - **Events** (`events`) - session event model and the `EventHandler` contract
//! - **Messages** (`message`) - outbound text and attachments
//! - **Bot** (`bot`) - `HBot`, the single-consumer event loop and send capability
//!
//! # Architecture
//!
//! ```text
//! SocketModeSource (task) --mpsc--> HBot::run --> EventHandler... --> HBot::send_message
//!                                                                          |
//!                                                               SlackWebClient (chat.postMessage)
//! ```

pub mod api;
pub mod bot;
pub mod events;
pub mod message;
pub mod socket;

pub use api::{ApiError, ChatApi, SlackWebClient, SocketConnector};
pub use bot::{HBot, MessageSender, SessionError, SessionState, TerminationReason};
pub use events::{EventHandler, HandlerError, HandlerResult, MessageEvent, SessionEvent};
pub use message::{Attachment, OutboundMessage, PostMessage};
pub use socket::{EventSource, ReconnectPolicy, SocketModeSource};
