//! Contact types.

use serde::{Deserialize, Serialize};

/// A contact as returned by `GET /api/contacts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaContact {
    /// JID or bare phone number.
    #[serde(default)]
    pub id: String,

    /// Name saved in the business phone's address book.
    #[serde(default)]
    pub name: Option<String>,

    /// The contact's own WhatsApp display name.
    #[serde(default)]
    pub notify: Option<String>,

    #[serde(default)]
    pub verified_name: Option<String>,

    #[serde(default)]
    pub img_url: Option<String>,

    /// About text.
    #[serde(default)]
    pub status: Option<String>,
}

impl WaContact {
    /// The phone digits of `id`, without any JID suffix.
    pub fn phone_digits(&self) -> &str {
        self.id
            .split_once('@')
            .map(|(user, _)| user)
            .unwrap_or(&self.id)
    }
}

/// Data of `GET /api/on-whatsapp/{jid}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnWhatsappData {
    #[serde(default)]
    pub exists: bool,
}

/// Data of `GET /api/contacts/{phone}/picture`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureData {
    #[serde(default)]
    pub img_url: Option<String>,
}
