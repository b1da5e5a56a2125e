use serde::Serialize;

/// Secondary payload rendered below the message body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image_url.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), attachments: Vec::new() }
    }

    pub fn attachment(attachment: Attachment) -> Self {
        Self { text: String::new(), attachments: vec![attachment] }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Body of a `chat.postMessage` call, stamped with the bot identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    pub username: String,
    pub icon_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl PostMessage {
    pub fn new(
        channel: impl Into<String>,
        message: OutboundMessage,
        username: impl Into<String>,
        icon_url: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            text: message.text,
            username: username.into(),
            icon_url: icon_url.into(),
            attachments: message.attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Attachment, OutboundMessage, PostMessage};

    #[test]
    fn post_message_serializes_slack_attachment_shape() {
        let message = OutboundMessage::attachment(
            Attachment::new().text("to the moon").image_url("https://example.test/a.gif"),
        );
        let body = PostMessage::new("C1", message, "hbot", "https://example.test/icon.jpg");

        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            value,
            json!({
                "channel": "C1",
                "text": "",
                "username": "hbot",
                "icon_url": "https://example.test/icon.jpg",
                "attachments": [
                    { "text": "to the moon", "image_url": "https://example.test/a.gif" }
                ]
            })
        );
    }

    #[test]
    fn plain_text_message_omits_attachments() {
        let body = PostMessage::new("C1", OutboundMessage::text("bang"), "hbot", "icon");

        let value = serde_json::to_value(&body).expect("serialize");
        assert!(value.get("attachments").is_none());
        assert_eq!(value["text"], "bang");
    }

    #[test]
    fn empty_attachment_serializes_as_empty_object() {
        let attachment = Attachment::new();

        assert!(attachment.is_empty());
        assert_eq!(serde_json::to_value(&attachment).expect("serialize"), json!({}));
    }
}
