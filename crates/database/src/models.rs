//! Database models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "lowercase")]
        #[sqlx(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

text_enum! {
    /// Lifecycle state of a conversation.
    ConversationStatus {
        Active => "active",
        Archived => "archived",
        Resolved => "resolved",
        Escalated => "escalated",
    }
}

text_enum! {
    /// Whether a message came from the contact or was sent to them.
    MessageDirection {
        Inbound => "inbound",
        Outbound => "outbound",
    }
}

text_enum! {
    /// Who authored a message.
    SenderType {
        User => "user",
        Admin => "admin",
        Ai => "ai",
    }
}

text_enum! {
    MessageType {
        Text => "text",
        Image => "image",
        Video => "video",
        Audio => "audio",
        Document => "document",
        Sticker => "sticker",
        Location => "location",
        Contact => "contact",
    }
}

text_enum! {
    /// Delivery state reported by WhatsApp.
    MessageStatus {
        Pending => "pending",
        Sent => "sent",
        Delivered => "delivered",
        Read => "read",
        Failed => "failed",
        Error => "error",
        Played => "played",
    }
}

/// A WhatsApp contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    /// UUID
    pub id: String,
    /// E.164 phone number, unique per contact
    pub phone_number: String,
    /// WhatsApp JID (e.g., "31612345678@s.whatsapp.net")
    pub whatsapp_jid: String,
    /// Name set by an admin
    pub display_name: Option<String>,
    /// Name the contact set on WhatsApp
    pub push_name: Option<String>,
    /// Business-verified name
    pub verified_name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_active: bool,
    pub last_seen_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Contact {
    /// Best available human-readable name, falling back to the phone number.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.push_name.as_deref())
            .or(self.verified_name.as_deref())
            .unwrap_or(&self.phone_number)
    }
}

/// A conversation row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// UUID
    pub id: String,
    pub whatsapp_contact_id: String,
    /// Remote JID of the chat, unique per conversation
    pub whatsapp_conversation_id: String,
    pub title: Option<String>,
    pub status: ConversationStatus,
    /// Inbound messages not yet seen by an admin
    pub unread_count: i64,
    pub last_message_at: Option<String>,
    pub ai_enabled: bool,
    /// JSON-encoded AI settings
    pub ai_config: Option<String>,
    /// Agent runtime thread bound to this conversation
    pub ai_thread_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A conversation joined with its contact and latest message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationWithContact {
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Content of the newest message, if any
    pub last_message: Option<String>,
    pub contact: Contact,
}

/// A message with its derived sender name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// UUID
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub direction: MessageDirection,
    /// True for messages sent from the business number
    pub from_me: bool,
    pub message_type: MessageType,
    pub sender_type: SenderType,
    /// Provider message id, used for deduplication
    pub whatsapp_message_id: Option<String>,
    pub whatsapp_status: MessageStatus,
    pub media_url: Option<String>,
    pub is_ai_triggered: bool,
    pub ai_thread_id: Option<String>,
    pub created_at: String,
    /// "AI Assistant", "BargainB", or the contact's name
    pub sender_name: String,
}

/// A CRM profile attached to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CrmProfile {
    pub id: String,
    pub whatsapp_contact_id: String,
    pub full_name: Option<String>,
    pub preferred_name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// An admin account, linked to the auth provider by `auth_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: String,
    /// User id issued by the auth provider
    pub auth_user_id: String,
    pub email: String,
    /// Role label (e.g., "admin", "super_admin")
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A logged exchange with the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AiInteraction {
    pub id: String,
    pub conversation_id: String,
    /// Caller-supplied user id
    pub user_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub thread_id: Option<String>,
    pub processing_time_ms: i64,
    /// Approximated by the response length
    pub tokens_used: i64,
    pub created_at: String,
}

/// Assistant assignment stored on a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationAssistant {
    pub conversation_id: String,
    pub assistant_id: Option<String>,
    pub assistant_name: Option<String>,
    /// JSON-encoded assistant config
    pub assistant_config: Option<String>,
    /// JSON-encoded assistant metadata
    pub assistant_metadata: Option<String>,
    pub assistant_created_at: Option<String>,
    pub ai_enabled: bool,
}

impl ConversationAssistant {
    /// True when an assistant is assigned and AI is enabled.
    pub fn has_assistant(&self) -> bool {
        self.assistant_id.is_some() && self.ai_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "Escalated".parse::<ConversationStatus>(),
            Ok(ConversationStatus::Escalated)
        );
        assert!("closed".parse::<ConversationStatus>().is_err());
    }

    #[test]
    fn enums_serialize_lowercase() {
        let json = serde_json::to_string(&SenderType::Ai).unwrap();
        assert_eq!(json, "\"ai\"");
        assert_eq!(MessageStatus::Delivered.to_string(), "delivered");
    }

    #[test]
    fn contact_name_prefers_display_name() {
        let mut contact = Contact {
            id: "c1".to_string(),
            phone_number: "+31612345678".to_string(),
            whatsapp_jid: "31612345678@s.whatsapp.net".to_string(),
            display_name: None,
            push_name: Some("Sanne".to_string()),
            verified_name: None,
            profile_picture_url: None,
            is_active: true,
            last_seen_at: None,
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
            updated_at: "2025-01-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(contact.name(), "Sanne");

        contact.display_name = Some("Sanne de Vries".to_string());
        assert_eq!(contact.name(), "Sanne de Vries");

        contact.display_name = None;
        contact.push_name = None;
        assert_eq!(contact.name(), "+31612345678");
    }
}
