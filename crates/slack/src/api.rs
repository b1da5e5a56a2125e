use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::message::PostMessage;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("slack api request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api returned error `{0}`")]
    Slack(String),
    #[error("slack api response is missing `{0}`")]
    MissingField(&'static str),
}

impl ApiError {
    /// Error codes Slack uses when a token is rejected outright.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Slack(code)
                if matches!(
                    code.as_str(),
                    "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked"
                        | "token_expired"
                )
        )
    }
}

/// Outbound half of the chat platform.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn post_message(&self, message: &PostMessage) -> Result<(), ApiError>;
}

/// Obtains a fresh Socket Mode WebSocket URL.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn open_connection(&self) -> Result<String, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
    url: Option<String>,
}

impl ApiResponse {
    fn into_result(self) -> Result<Self, ApiError> {
        if self.ok {
            Ok(self)
        } else {
            Err(ApiError::Slack(self.error.unwrap_or_else(|| "unknown_error".to_owned())))
        }
    }
}

/// Slack Web API client. `chat.postMessage` uses the bot token,
/// `apps.connections.open` uses the app-level token.
pub struct SlackWebClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    app_token: SecretString,
}

impl SlackWebClient {
    pub fn new(base_url: &str, bot_token: SecretString, app_token: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            bot_token,
            app_token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

#[async_trait]
impl ChatApi for SlackWebClient {
    async fn post_message(&self, message: &PostMessage) -> Result<(), ApiError> {
        debug!(channel_id = %message.channel, "chat.postMessage");

        let response = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(message)
            .send()
            .await?;

        let api_response: ApiResponse = response.json().await?;
        api_response.into_result().map(|_| ())
    }
}

#[async_trait]
impl SocketConnector for SlackWebClient {
    async fn open_connection(&self) -> Result<String, ApiError> {
        debug!("apps.connections.open");

        let response = self
            .client
            .post(self.method_url("apps.connections.open"))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await?;

        let api_response: ApiResponse = response.json().await?;
        api_response.into_result()?.url.ok_or(ApiError::MissingField("url"))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{ApiError, ApiResponse, SlackWebClient};

    #[test]
    fn failed_response_maps_to_slack_error_code() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).expect("parse");

        let error = response.into_result().expect_err("ok=false should fail");
        assert!(matches!(error, ApiError::Slack(ref code) if code == "channel_not_found"));
        assert!(!error.is_auth_failure());
    }

    #[test]
    fn connection_open_response_carries_url() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"ok":true,"url":"wss://wss.slack.test/link"}"#)
                .expect("parse");

        let response = response.into_result().expect("ok response");
        assert_eq!(response.url.as_deref(), Some("wss://wss.slack.test/link"));
    }

    #[test]
    fn auth_error_codes_are_classified() {
        assert!(ApiError::Slack("invalid_auth".to_owned()).is_auth_failure());
        assert!(ApiError::Slack("not_authed".to_owned()).is_auth_failure());
        assert!(ApiError::Slack("token_revoked".to_owned()).is_auth_failure());
        assert!(!ApiError::Slack("ratelimited".to_owned()).is_auth_failure());
        assert!(!ApiError::MissingField("url").is_auth_failure());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = SlackWebClient::new(
            "https://slack.test/api/",
            SecretString::from("xoxb-test".to_owned()),
            SecretString::from("xapp-test".to_owned()),
        );

        assert_eq!(client.method_url("chat.postMessage"), "https://slack.test/api/chat.postMessage");
    }
}
