//! Types for sending messages.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/send-message`.
///
/// Exactly one of the content fields is normally set; WASender treats
/// `text` as the caption when a media URL is also present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Recipient phone number in E.164 format, or a group JID.
    pub to: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Sent as a voice note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,

    /// `.webp` sticker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_url: Option<String>,
}

impl SendMessageRequest {
    /// A plain text message.
    pub fn text(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// An image with an optional caption.
    pub fn image(to: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            image_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the caption or text body.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_document(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }

    /// True when there is something to send.
    pub fn has_content(&self) -> bool {
        [
            &self.text,
            &self.image_url,
            &self.video_url,
            &self.audio_url,
            &self.document_url,
            &self.sticker_url,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Response of `POST /api/send-message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SentMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Details of an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// Provider message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jid: Option<String>,

    /// "in_progress", "sent", "delivered", "read" or "failed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
