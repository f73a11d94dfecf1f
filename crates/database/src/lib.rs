//! SQLite persistence layer for the BargainB admin backend.
//!
//! This crate owns the schema for WhatsApp contacts, conversations, messages,
//! admin accounts and AI interaction logs, and exposes async operations over
//! them using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{contact, conversation, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:bargainb.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let contact = contact::upsert_contact(
//!         db.pool(),
//!         &contact::NewContact::from_phone("+31612345678")?,
//!     )
//!     .await?;
//!     let chat = conversation::find_or_create_for_contact(db.pool(), &contact).await?;
//!     println!("conversation {}", chat.id);
//!
//!     Ok(())
//! }
//! ```

pub mod admin_user;
pub mod ai_interaction;
pub mod assistant;
pub mod contact;
pub mod conversation;
pub mod customer;
pub mod error;
pub mod message;
pub mod models;
pub mod notification;
pub mod phone;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    AdminUser, AiInteraction, Contact, Conversation, ConversationAssistant,
    ConversationStatus, ConversationWithContact, CrmProfile, Message, MessageDirection,
    MessageStatus, MessageType, SenderType,
};
pub use validation::ValidationError;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Every `sqlite::memory:` connection is its own database, so tests use
    /// [`Database::connect_with_pool_size`] with a pool of one.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url, pool_size, "Connected to database");

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness check used by the health route.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
///
/// Matches the format of the schema's column defaults so stamps sort
/// lexically.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fresh UUID v4 string for a new row.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::contact::{self, NewContact};
    use crate::conversation;
    use crate::message::{self, NewMessage};

    pub async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    pub async fn seed_contact(db: &Database, phone: &str, push_name: Option<&str>) -> Contact {
        let mut new = NewContact::from_phone(phone).unwrap();
        new.push_name = push_name.map(str::to_string);
        contact::create_contact(db.pool(), &new).await.unwrap()
    }

    pub async fn seed_conversation(db: &Database, phone: &str, push_name: &str) -> Conversation {
        let contact = seed_contact(db, phone, Some(push_name)).await;
        conversation::find_or_create_for_contact(db.pool(), &contact)
            .await
            .unwrap()
    }

    pub async fn seed_message(
        db: &Database,
        conversation_id: &str,
        content: &str,
        direction: MessageDirection,
        created_at: &str,
    ) -> Message {
        let new = match direction {
            MessageDirection::Inbound => NewMessage::inbound(conversation_id, content),
            MessageDirection::Outbound => {
                NewMessage::outbound(conversation_id, content, SenderType::Admin)
            }
        }
        .with_created_at(created_at);
        message::create_message(db.pool(), &new).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_and_ping() {
        let db = test_support::test_db().await;
        db.ping().await.unwrap();

        // Running again is a no-op.
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[test]
    fn now_is_rfc3339_millis_utc() {
        let stamp = now();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2025-01-01T00:00:00.000Z".len());
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
