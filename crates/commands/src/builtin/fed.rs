use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use hbot_slack::{Attachment, MessageSender, OutboundMessage};
use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::command::{Command, CommandError, CommandInvocation};

/// Shape of the JSON document behind `--fedfile`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FedDefinition {
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FedError {
    #[error("failed to read fed file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse fed file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid fed file `{path}`: {reason}")]
    Validation { path: PathBuf, reason: String },
}

impl FedDefinition {
    pub fn load(path: &Path) -> Result<Self, FedError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| FedError::Read { path: path.to_path_buf(), source })?;
        let definition: Self = serde_json::from_str(&raw)
            .map_err(|source| FedError::Parse { path: path.to_path_buf(), source })?;
        definition
            .validate()
            .map_err(|reason| FedError::Validation { path: path.to_path_buf(), reason })?;
        Ok(definition)
    }

    /// A name with whitespace could never be matched by the single-space tokenizer.
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("`name` must not be empty".to_owned());
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(format!("`name` must be a single word, got `{}`", self.name));
        }
        Ok(())
    }
}

/// Replies with a randomly chosen phrase and image from a [`FedDefinition`].
///
/// Phrase and image are drawn independently and uniformly on every call.
pub struct FedCommand {
    definition: FedDefinition,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FedCommand {
    pub fn new(definition: FedDefinition) -> Self {
        Self::with_rng(definition, Box::new(StdRng::from_entropy()))
    }

    pub fn with_rng(definition: FedDefinition, rng: Box<dyn RngCore + Send>) -> Self {
        Self { definition, rng: Mutex::new(rng) }
    }

    pub fn definition(&self) -> &FedDefinition {
        &self.definition
    }

    async fn pick(&self) -> Attachment {
        let mut rng = self.rng.lock().await;
        let mut attachment = Attachment::new();
        if let Some(phrase) = self.definition.phrases.choose(&mut **rng) {
            attachment = attachment.text(phrase.clone());
        }
        if let Some(image) = self.definition.images.choose(&mut **rng) {
            attachment = attachment.image_url(image.clone());
        }
        attachment
    }
}

#[async_trait]
impl Command for FedCommand {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn help(&self) -> &str {
        &self.definition.help
    }

    async fn execute(
        &self,
        invocation: &CommandInvocation,
        bot: &dyn MessageSender,
    ) -> Result<(), CommandError> {
        let attachment = self.pick().await;
        bot.send_message(&invocation.channel_id, OutboundMessage::attachment(attachment)).await?;
        Ok(())
    }
}
