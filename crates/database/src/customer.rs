//! Customer-level operations spanning a contact and everything hanging off it.

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DatabaseError, Result};
use crate::models::CrmProfile;
use crate::{new_id, now};

/// Fields for a CRM profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCrmProfile {
    pub full_name: Option<String>,
    pub preferred_name: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// Rows removed by [`delete_customer`], per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub customer_events: u64,
    pub grocery_lists: u64,
    pub messages: u64,
    pub conversations: u64,
    pub crm_profiles: u64,
}

/// Attach a CRM profile to a contact.
pub async fn create_crm_profile(
    pool: &SqlitePool,
    contact_id: &str,
    profile: &NewCrmProfile,
) -> Result<CrmProfile> {
    crate::contact::get_contact(pool, contact_id).await?;

    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO crm_profiles
            (id, whatsapp_contact_id, full_name, preferred_name, email, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(contact_id)
    .bind(&profile.full_name)
    .bind(&profile.preferred_name)
    .bind(&profile.email)
    .bind(&profile.notes)
    .bind(now())
    .execute(pool)
    .await?;

    get_crm_profile(pool, contact_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "CrmProfile",
            id,
        })
}

/// The newest CRM profile of a contact.
pub async fn get_crm_profile(pool: &SqlitePool, contact_id: &str) -> Result<Option<CrmProfile>> {
    let profile = sqlx::query_as::<_, CrmProfile>(
        r#"
        SELECT id, whatsapp_contact_id, full_name, preferred_name, email, notes, created_at
        FROM crm_profiles
        WHERE whatsapp_contact_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(contact_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

async fn delete_step(
    tx: &mut Transaction<'_, Sqlite>,
    step: &'static str,
    sql: &str,
    contact_id: &str,
) -> Result<u64> {
    let result = sqlx::query(sql)
        .bind(contact_id)
        .execute(&mut **tx)
        .await
        .map_err(|source| DatabaseError::DeleteStep { step, source })?;

    tracing::debug!(step, rows = result.rows_affected(), "Deleted customer rows");
    Ok(result.rows_affected())
}

/// Permanently delete a contact and all data that references it.
///
/// Steps run in dependency order inside one transaction: customer events,
/// grocery lists, messages, conversations, CRM profiles, then the contact.
/// A failing step rolls back everything and is reported by name.
pub async fn delete_customer(pool: &SqlitePool, contact_id: &str) -> Result<DeletionReport> {
    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM whatsapp_contacts WHERE id = ?")
        .bind(contact_id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Contact",
            id: contact_id.to_string(),
        });
    }

    let report = DeletionReport {
        customer_events: delete_step(
            &mut tx,
            "customer events",
            "DELETE FROM customer_events WHERE contact_id = ?",
            contact_id,
        )
        .await?,
        grocery_lists: delete_step(
            &mut tx,
            "grocery lists",
            "DELETE FROM grocery_lists WHERE contact_id = ?",
            contact_id,
        )
        .await?,
        messages: delete_step(
            &mut tx,
            "messages",
            "DELETE FROM messages WHERE conversation_id IN \
             (SELECT id FROM conversations WHERE whatsapp_contact_id = ?)",
            contact_id,
        )
        .await?,
        conversations: delete_step(
            &mut tx,
            "conversations",
            "DELETE FROM conversations WHERE whatsapp_contact_id = ?",
            contact_id,
        )
        .await?,
        crm_profiles: delete_step(
            &mut tx,
            "CRM profile",
            "DELETE FROM crm_profiles WHERE whatsapp_contact_id = ?",
            contact_id,
        )
        .await?,
    };

    delete_step(
        &mut tx,
        "WhatsApp contact",
        "DELETE FROM whatsapp_contacts WHERE id = ?",
        contact_id,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(contact_id, ?report, "Deleted customer");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageDirection;
    use crate::test_support::{seed_conversation, seed_message, test_db};

    async fn seed_extras(pool: &SqlitePool, contact_id: &str) {
        sqlx::query("INSERT INTO customer_events (id, contact_id, event_type) VALUES ('e1', ?, 'signup')")
            .bind(contact_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO grocery_lists (id, contact_id, list_name) VALUES ('g1', ?, 'Weekboodschappen')")
            .bind(contact_id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deletes_everything_for_the_contact() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        let other = seed_conversation(&db, "+31687654321", "Pieter").await;
        let contact_id = chat.whatsapp_contact_id.clone();

        seed_message(&db, &chat.id, "hoi", MessageDirection::Inbound, "2025-03-01T10:00:00.000Z").await;
        seed_message(&db, &chat.id, "dag", MessageDirection::Outbound, "2025-03-01T10:01:00.000Z").await;
        seed_message(&db, &other.id, "blijft", MessageDirection::Inbound, "2025-03-01T10:02:00.000Z").await;
        seed_extras(db.pool(), &contact_id).await;
        create_crm_profile(
            db.pool(),
            &contact_id,
            &NewCrmProfile {
                full_name: Some("Sanne de Vries".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let report = delete_customer(db.pool(), &contact_id).await.unwrap();
        assert_eq!(
            report,
            DeletionReport {
                customer_events: 1,
                grocery_lists: 1,
                messages: 2,
                conversations: 1,
                crm_profiles: 1,
            }
        );

        assert!(crate::contact::get_contact(db.pool(), &contact_id).await.is_err());
        assert!(get_crm_profile(db.pool(), &contact_id).await.unwrap().is_none());
        let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn missing_contact_is_not_found() {
        let db = test_db().await;
        assert!(matches!(
            delete_customer(db.pool(), "missing").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn failing_step_is_named_and_rolled_back() {
        let db = test_db().await;
        let chat = seed_conversation(&db, "+31612345678", "Sanne").await;
        let contact_id = chat.whatsapp_contact_id.clone();
        seed_extras(db.pool(), &contact_id).await;

        // A row this delete does not know about keeps the conversation referenced.
        sqlx::query("CREATE TABLE pinned (conversation_id TEXT NOT NULL REFERENCES conversations(id))")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO pinned (conversation_id) VALUES (?)")
            .bind(&chat.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = delete_customer(db.pool(), &contact_id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DeleteStep { step: "conversations", .. }));

        // Events were deleted before the failure and must be back.
        let events = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer_events")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(events, 1);
    }
}
