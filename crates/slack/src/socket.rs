use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{
    api::SocketConnector,
    events::{MessageEvent, SessionEvent},
};

/// Produces session events for [`crate::bot::HBot::run`]. Invoked once, on
/// its own task; returning (dropping `events`) closes the session queue.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn manage_connection(&self, events: mpsc::Sender<SessionEvent>);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Slack Socket Mode connection manager.
///
/// Opens a WebSocket through `apps.connections.open`, acknowledges every
/// envelope and forwards translated events. Slack periodically asks clients to
/// reconnect with a `disconnect` frame; that is handled here by opening a new
/// socket, so the session only sees a continuous event stream.
pub struct SocketModeSource {
    connector: Arc<dyn SocketConnector>,
    reconnect_policy: ReconnectPolicy,
}

enum PumpExit {
    RefreshRequested,
    Closed,
    ReceiverDropped,
}

impl SocketModeSource {
    pub fn new(connector: Arc<dyn SocketConnector>, reconnect_policy: ReconnectPolicy) -> Self {
        Self { connector, reconnect_policy }
    }

    async fn pump(
        &self,
        url: &str,
        events: &mpsc::Sender<SessionEvent>,
    ) -> Result<PumpExit, String> {
        let (stream, _) =
            connect_async(url).await.map_err(|error| format!("websocket connect failed: {error}"))?;
        info!(event_name = "ingress.slack.socket_connected", "socket mode connection established");
        let (mut writer, mut reader) = stream.split();

        while let Some(message) = reader.next().await {
            let message = message.map_err(|error| format!("websocket read failed: {error}"))?;
            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    info!(frame = ?frame, "socket mode connection closed by server");
                    return Ok(PumpExit::Closed);
                }
                _ => continue,
            };

            let frame: SocketFrame = serde_json::from_str(&text)
                .map_err(|error| format!("malformed socket mode frame: {error}"))?;

            if let Some(envelope_id) = &frame.envelope_id {
                let ack = serde_json::json!({ "envelope_id": envelope_id }).to_string();
                if let Err(error) = writer.send(Message::Text(ack)).await {
                    warn!(
                        event_name = "ingress.slack.ack_failed",
                        envelope_id = %envelope_id,
                        error = %error,
                        "failed to acknowledge slack envelope"
                    );
                } else {
                    debug!(
                        event_name = "ingress.slack.ack_sent",
                        envelope_id = %envelope_id,
                        "acknowledged slack envelope"
                    );
                }
            }

            match translate_frame(frame) {
                FrameAction::Forward(event) => {
                    if events.send(event).await.is_err() {
                        return Ok(PumpExit::ReceiverDropped);
                    }
                }
                FrameAction::Reconnect { reason } => {
                    info!(reason = %reason, "slack requested reconnect");
                    return Ok(PumpExit::RefreshRequested);
                }
            }
        }

        Ok(PumpExit::Closed)
    }
}

#[async_trait]
impl EventSource for SocketModeSource {
    async fn manage_connection(&self, events: mpsc::Sender<SessionEvent>) {
        let mut failures = 0_u32;

        loop {
            let url = match self.connector.open_connection().await {
                Ok(url) => url,
                Err(error) if error.is_auth_failure() => {
                    let reason = error.to_string();
                    let _ = events.send(SessionEvent::AuthFailure { reason }).await;
                    return;
                }
                Err(error) => {
                    warn!(
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %error,
                        "socket mode connection open failed"
                    );
                    if failures >= self.reconnect_policy.max_retries {
                        let reason = format!("connection open retries exhausted: {error}");
                        let _ = events.send(SessionEvent::ProtocolError { reason }).await;
                        return;
                    }

                    let delay = self.reconnect_policy.backoff(failures);
                    failures += 1;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
            };

            match self.pump(&url, &events).await {
                Ok(PumpExit::RefreshRequested) => failures = 0,
                Ok(PumpExit::Closed) | Ok(PumpExit::ReceiverDropped) => return,
                Err(reason) => {
                    let _ = events.send(SessionEvent::ProtocolError { reason }).await;
                    return;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SocketFrame {
    #[serde(rename = "type")]
    frame_type: String,
    envelope_id: Option<String>,
    payload: Option<Value>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventCallback {
    event: Option<InnerEvent>,
}

#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    event_type: String,
    channel: Option<String>,
    user: Option<String>,
    text: Option<String>,
    subtype: Option<String>,
    bot_id: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum FrameAction {
    Forward(SessionEvent),
    Reconnect { reason: String },
}

fn translate_frame(frame: SocketFrame) -> FrameAction {
    match frame.frame_type.as_str() {
        "disconnect" => FrameAction::Reconnect {
            reason: frame.reason.unwrap_or_else(|| "unspecified".to_owned()),
        },
        "events_api" => {
            let inner = frame
                .payload
                .and_then(|payload| serde_json::from_value::<EventCallback>(payload).ok())
                .and_then(|callback| callback.event);
            match inner {
                Some(event) if event.event_type == "message" => {
                    FrameAction::Forward(SessionEvent::Message(MessageEvent {
                        channel_id: event.channel.unwrap_or_default(),
                        user_id: event.user.unwrap_or_default(),
                        text: event.text.unwrap_or_default(),
                        subtype: event.subtype,
                        bot_id: event.bot_id,
                    }))
                }
                Some(event) => {
                    FrameAction::Forward(SessionEvent::Other { event_type: event.event_type })
                }
                None => FrameAction::Forward(SessionEvent::Other { event_type: frame.frame_type }),
            }
        }
        _ => FrameAction::Forward(SessionEvent::Other { event_type: frame.frame_type }),
    }
}
