//! Webhook payloads WASender posts for WhatsApp events.

use serde::{Deserialize, Serialize};

/// Event name for new or edited messages.
pub const EVENT_MESSAGES_UPSERT: &str = "messages.upsert";
/// Event name for delivery status changes.
pub const EVENT_MESSAGES_UPDATE: &str = "messages.update";
/// Event name for session connection changes.
pub const EVENT_SESSION_STATUS: &str = "session.status";

/// Top-level webhook body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// "messages.upsert", "messages.update" or "session.status".
    pub event: String,

    #[serde(default)]
    pub data: WebhookData,
}

impl WebhookPayload {
    /// True for events carrying new messages.
    pub fn is_message_upsert(&self) -> bool {
        self.event == EVENT_MESSAGES_UPSERT
    }

    /// True for delivery and read receipts.
    pub fn is_message_update(&self) -> bool {
        self.event == EVENT_MESSAGES_UPDATE
    }

    /// Provider message id and new status of a `messages.update` event.
    ///
    /// `None` when the id is missing or the status code is unknown.
    pub fn status_update(&self) -> Option<(&str, DeliveryStatus)> {
        let key = self.data.key.as_ref()?;
        let code = self.data.update.as_ref()?.status?;
        Some((key.id.as_str(), DeliveryStatus::from_code(code)?))
    }
}

/// Event data.
///
/// `messages.upsert` fills `messages`; `messages.update` fills `key` and
/// `update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<MessageKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<MessageUpdate>,
}

/// Changed fields of a `messages.update` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageUpdate {
    /// Numeric delivery status, see [`DeliveryStatus`].
    #[serde(default)]
    pub status: Option<i64>,
}

/// WhatsApp delivery status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Error,
    Pending,
    Sent,
    Delivered,
    Read,
    /// Voice note or video listened to.
    Played,
}

impl DeliveryStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::Pending),
            2 => Some(Self::Sent),
            3 => Some(Self::Delivered),
            4 => Some(Self::Read),
            5 => Some(Self::Played),
            _ => None,
        }
    }
}

/// A single WhatsApp message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    pub key: MessageKey,

    #[serde(default)]
    pub message: Option<MessageContent>,

    /// The sender's WhatsApp display name.
    #[serde(default)]
    pub push_name: Option<String>,

    /// Unix timestamp in seconds.
    #[serde(default)]
    pub message_timestamp: i64,
}

/// Identity of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    /// Chat JID (e.g., "31612345678@s.whatsapp.net").
    pub remote_jid: String,

    /// True when sent from the business number.
    #[serde(default)]
    pub from_me: bool,

    /// Provider message id (e.g., "BAE5A93B52084A3B").
    pub id: String,
}

/// Message body variants. At most one is normally present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    /// Plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,

    /// Text of replies and messages with link previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text_message: Option<ExtendedTextMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_message: Option<MediaMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_message: Option<MediaMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_message: Option<MediaMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_message: Option<MediaMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_message: Option<MediaMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedTextMessage {
    #[serde(default)]
    pub text: String,
}

/// Encrypted media reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub media_key: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Kind of content carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
}

/// Displayable content of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Message text, or a placeholder such as "[Image]" for media.
    pub text: String,
    pub kind: ContentKind,
    /// Download URL of the media, if any.
    pub media_url: Option<String>,
}

impl ExtractedContent {
    /// True for text messages with nothing but whitespace.
    pub fn is_empty_text(&self) -> bool {
        self.kind == ContentKind::Text && self.text.trim().is_empty()
    }
}

impl WebhookMessage {
    /// Extract the text or a media placeholder.
    ///
    /// `extendedTextMessage.text` wins over `conversation`; media are checked
    /// in the order image, video, audio, document, sticker.
    pub fn content(&self) -> ExtractedContent {
        let empty = ExtractedContent {
            text: String::new(),
            kind: ContentKind::Text,
            media_url: None,
        };
        let Some(message) = &self.message else {
            return empty;
        };

        if let Some(ext) = message
            .extended_text_message
            .as_ref()
            .filter(|ext| !ext.text.is_empty())
        {
            return ExtractedContent {
                text: ext.text.clone(),
                ..empty
            };
        }

        if let Some(text) = message.conversation.as_ref().filter(|t| !t.is_empty()) {
            return ExtractedContent {
                text: text.clone(),
                ..empty
            };
        }

        let media = [
            (&message.image_message, ContentKind::Image, "[Image]"),
            (&message.video_message, ContentKind::Video, "[Video]"),
            (&message.audio_message, ContentKind::Audio, "[Audio]"),
            (&message.document_message, ContentKind::Document, "[Document]"),
            (&message.sticker_message, ContentKind::Sticker, "[Sticker]"),
        ];
        for (slot, kind, placeholder) in media {
            if let Some(found) = slot {
                return ExtractedContent {
                    text: placeholder.to_string(),
                    kind,
                    media_url: found.url.clone(),
                };
            }
        }

        empty
    }

    /// Phone digits of the chat, with the JID suffix removed.
    pub fn remote_phone(&self) -> &str {
        let jid = self.key.remote_jid.as_str();
        jid.strip_suffix("@s.whatsapp.net")
            .or_else(|| jid.strip_suffix("@c.us"))
            .unwrap_or(jid)
    }

    /// True for group chats, which the admin inbox does not track.
    pub fn is_group(&self) -> bool {
        self.key.remote_jid.ends_with("@g.us")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WebhookMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extended_text_wins_over_conversation() {
        let msg = parse(
            r#"{
                "key": {"remoteJid": "31612345678@s.whatsapp.net", "fromMe": false, "id": "A1"},
                "message": {"conversation": "plain", "extendedTextMessage": {"text": "@bb waar is koffie?"}},
                "pushName": "Sanne",
                "messageTimestamp": 1735725600
            }"#,
        );
        let content = msg.content();
        assert_eq!(content.text, "@bb waar is koffie?");
        assert_eq!(content.kind, ContentKind::Text);
        assert_eq!(msg.remote_phone(), "31612345678");
        assert_eq!(msg.push_name.as_deref(), Some("Sanne"));
        assert_eq!(msg.message_timestamp, 1_735_725_600);
    }

    #[test]
    fn media_placeholders() {
        let msg = parse(
            r#"{
                "key": {"remoteJid": "31612345678@c.us", "fromMe": true, "id": "A2"},
                "message": {"imageMessage": {"url": "https://mmg.whatsapp.net/x", "mimetype": "image/jpeg"}},
                "messageTimestamp": 1
            }"#,
        );
        let content = msg.content();
        assert_eq!(content.text, "[Image]");
        assert_eq!(content.kind, ContentKind::Image);
        assert_eq!(content.media_url.as_deref(), Some("https://mmg.whatsapp.net/x"));
        assert_eq!(msg.remote_phone(), "31612345678");
        assert!(msg.key.from_me);

        let sticker = parse(
            r#"{"key": {"remoteJid": "1@s.whatsapp.net", "id": "A3"}, "message": {"stickerMessage": {}}}"#,
        );
        assert_eq!(sticker.content().text, "[Sticker]");
    }

    #[test]
    fn missing_body_is_empty_text() {
        let msg = parse(r#"{"key": {"remoteJid": "1@s.whatsapp.net", "id": "A4"}}"#);
        assert!(msg.content().is_empty_text());
        assert_eq!(msg.message_timestamp, 0);
    }

    #[test]
    fn payload_event_and_groups() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "event": "messages.upsert",
                "data": {"messages": [
                    {"key": {"remoteJid": "120363@g.us", "fromMe": false, "id": "G1"},
                     "message": {"conversation": "hoi allemaal"}}
                ]}
            }"#,
        )
        .unwrap();
        assert!(payload.is_message_upsert());
        assert!(payload.data.messages[0].is_group());

        let status: WebhookPayload =
            serde_json::from_str(r#"{"event": "session.status"}"#).unwrap();
        assert!(!status.is_message_upsert());
        assert!(status.data.messages.is_empty());
    }

    #[test]
    fn receipt_status_codes() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "event": "messages.update",
                "data": {
                    "key": {"remoteJid": "31612345678@s.whatsapp.net", "fromMe": true, "id": "R1"},
                    "update": {"status": 4}
                }
            }"#,
        )
        .unwrap();
        assert!(payload.is_message_update());
        assert_eq!(payload.status_update(), Some(("R1", DeliveryStatus::Read)));

        assert_eq!(DeliveryStatus::from_code(5), Some(DeliveryStatus::Played));
        assert_eq!(DeliveryStatus::from_code(9), None);

        let unknown: WebhookPayload = serde_json::from_str(
            r#"{"event": "messages.update", "data": {"key": {"remoteJid": "1@s.whatsapp.net", "id": "R2"}, "update": {"status": 42}}}"#,
        )
        .unwrap();
        assert_eq!(unknown.status_update(), None);
    }
}
