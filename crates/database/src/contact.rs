//! WhatsApp contact operations.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::Contact;
use crate::validation::{self, ValidationError};
use crate::{new_id, now, phone};

const CONTACT_COLUMNS: &str = r#"
    id, phone_number, whatsapp_jid, display_name, push_name, verified_name,
    profile_picture_url, is_active, last_seen_at, created_at, updated_at
"#;

/// Fields for a new contact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    pub phone_number: String,
    pub whatsapp_jid: String,
    pub display_name: Option<String>,
    pub push_name: Option<String>,
    pub verified_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

impl NewContact {
    /// Build a contact from a raw phone number, normalising it and deriving the JID.
    pub fn from_phone(raw: &str) -> std::result::Result<Self, ValidationError> {
        let phone_number = validation::validate_phone_number(raw)?;
        Ok(Self {
            whatsapp_jid: phone::to_whatsapp_jid(&phone_number),
            phone_number,
            ..Default::default()
        })
    }

    /// Build a contact from a WhatsApp JID.
    pub fn from_jid(jid: &str) -> Self {
        Self {
            phone_number: phone::extract_phone_from_jid(jid),
            whatsapp_jid: jid.to_string(),
            ..Default::default()
        }
    }

    pub fn with_push_name(mut self, push_name: impl Into<String>) -> Self {
        self.push_name = Some(push_name.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Partial update for a contact; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub display_name: Option<String>,
    pub push_name: Option<String>,
    pub verified_name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for listing contacts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFilters {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One page of contacts.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContactPage {
    pub contacts: Vec<Contact>,
    pub total_count: i64,
}

/// Create a new contact.
pub async fn create_contact(pool: &SqlitePool, contact: &NewContact) -> Result<Contact> {
    validation::require("phone_number", &contact.phone_number)?;
    validation::require("whatsapp_jid", &contact.whatsapp_jid)?;

    let id = new_id();
    let stamp = now();

    sqlx::query(
        r#"
        INSERT INTO whatsapp_contacts
            (id, phone_number, whatsapp_jid, display_name, push_name, verified_name,
             profile_picture_url, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&contact.phone_number)
    .bind(&contact.whatsapp_jid)
    .bind(&contact.display_name)
    .bind(&contact.push_name)
    .bind(&contact.verified_name)
    .bind(&contact.profile_picture_url)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Contact", &contact.phone_number))?;

    tracing::debug!(contact_id = %id, phone = %contact.phone_number, "Created contact");
    get_contact(pool, &id).await
}

/// Insert a contact, or refresh the names of the existing one with the same phone number.
///
/// Names are only overwritten with non-null values.
pub async fn upsert_contact(pool: &SqlitePool, contact: &NewContact) -> Result<Contact> {
    validation::require("phone_number", &contact.phone_number)?;

    let stamp = now();
    sqlx::query(
        r#"
        INSERT INTO whatsapp_contacts
            (id, phone_number, whatsapp_jid, display_name, push_name, verified_name,
             profile_picture_url, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT(phone_number) DO UPDATE SET
            whatsapp_jid = excluded.whatsapp_jid,
            display_name = COALESCE(excluded.display_name, display_name),
            push_name = COALESCE(excluded.push_name, push_name),
            verified_name = COALESCE(excluded.verified_name, verified_name),
            profile_picture_url = COALESCE(excluded.profile_picture_url, profile_picture_url),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(new_id())
    .bind(&contact.phone_number)
    .bind(&contact.whatsapp_jid)
    .bind(&contact.display_name)
    .bind(&contact.push_name)
    .bind(&contact.verified_name)
    .bind(&contact.profile_picture_url)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await?;

    get_contact_by_phone(pool, &contact.phone_number)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Contact",
            id: contact.phone_number.clone(),
        })
}

/// Get a contact by ID.
pub async fn get_contact(pool: &SqlitePool, id: &str) -> Result<Contact> {
    sqlx::query_as::<_, Contact>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM whatsapp_contacts WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Contact",
        id: id.to_string(),
    })
}

/// Get a contact by its E.164 phone number.
pub async fn get_contact_by_phone(pool: &SqlitePool, phone_number: &str) -> Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM whatsapp_contacts WHERE phone_number = ?"
    ))
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}

fn push_contact_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &ContactFilters) {
    qb.push(" WHERE 1 = 1");

    if let Some(active) = filters.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }

    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term.to_lowercase());
        qb.push(" AND (LOWER(COALESCE(display_name, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(push_name, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(verified_name, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone_number LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// List contacts, newest first.
pub async fn get_contacts(pool: &SqlitePool, filters: &ContactFilters) -> Result<ContactPage> {
    let limit = filters.limit.unwrap_or(50).clamp(1, 500);
    let offset = filters.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {CONTACT_COLUMNS} FROM whatsapp_contacts"
    ));
    push_contact_filters(&mut qb, filters);
    qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let contacts = qb.build_query_as::<Contact>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM whatsapp_contacts");
    push_contact_filters(&mut count, filters);
    let total_count = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok(ContactPage {
        contacts,
        total_count,
    })
}

/// Case-insensitive search over names and phone number.
pub async fn search_contacts(pool: &SqlitePool, term: &str, limit: i64) -> Result<Vec<Contact>> {
    let page = get_contacts(
        pool,
        &ContactFilters {
            search: Some(term.to_string()),
            limit: Some(limit),
            ..Default::default()
        },
    )
    .await?;
    Ok(page.contacts)
}

/// Apply a partial update and return the refreshed contact.
pub async fn update_contact(pool: &SqlitePool, id: &str, update: &ContactUpdate) -> Result<Contact> {
    let result = sqlx::query(
        r#"
        UPDATE whatsapp_contacts
        SET display_name = COALESCE(?, display_name),
            push_name = COALESCE(?, push_name),
            verified_name = COALESCE(?, verified_name),
            profile_picture_url = COALESCE(?, profile_picture_url),
            is_active = COALESCE(?, is_active),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.display_name)
    .bind(&update.push_name)
    .bind(&update.verified_name)
    .bind(&update.profile_picture_url)
    .bind(update.is_active)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Contact",
            id: id.to_string(),
        });
    }

    get_contact(pool, id).await
}

/// Record when the contact was last active.
pub async fn update_last_seen(pool: &SqlitePool, id: &str, seen_at: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE whatsapp_contacts
        SET last_seen_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(seen_at)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Contact",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Count contacts with `is_active` set.
pub async fn count_active_contacts(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM whatsapp_contacts WHERE is_active = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_contact, test_db};

    #[tokio::test]
    async fn create_and_fetch() {
        let db = test_db().await;
        let created = seed_contact(&db, "+31 6 12345678", Some("Sanne")).await;

        assert_eq!(created.phone_number, "+31612345678");
        assert_eq!(created.whatsapp_jid, "31612345678@s.whatsapp.net");
        assert!(created.is_active);

        let fetched = get_contact(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched, created);

        let by_phone = get_contact_by_phone(db.pool(), "+31612345678")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_phone.id, created.id);

        assert!(get_contact_by_phone(db.pool(), "+31699999999")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let db = test_db().await;
        seed_contact(&db, "+31612345678", None).await;

        let again = NewContact::from_phone("+31612345678").unwrap();
        let result = create_contact(db.pool(), &again).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn upsert_keeps_id_and_existing_names() {
        let db = test_db().await;
        let first = upsert_contact(
            db.pool(),
            &NewContact::from_jid("31612345678@s.whatsapp.net").with_display_name("Sanne"),
        )
        .await
        .unwrap();

        let second = upsert_contact(
            db.pool(),
            &NewContact::from_jid("31612345678@s.whatsapp.net").with_push_name("S."),
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name.as_deref(), Some("Sanne"));
        assert_eq!(second.push_name.as_deref(), Some("S."));
    }

    #[tokio::test]
    async fn list_search_and_update() {
        let db = test_db().await;
        let sanne = seed_contact(&db, "+31612345678", Some("Sanne")).await;
        seed_contact(&db, "+31687654321", Some("Pieter")).await;

        let page = get_contacts(db.pool(), &ContactFilters::default()).await.unwrap();
        assert_eq!(page.total_count, 2);

        let found = search_contacts(db.pool(), "SAN", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, sanne.id);

        let by_digits = search_contacts(db.pool(), "876543", 10).await.unwrap();
        assert_eq!(by_digits.len(), 1);

        let updated = update_contact(
            db.pool(),
            &sanne.id,
            &ContactUpdate {
                display_name: Some("Sanne de Vries".to_string()),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Sanne de Vries"));
        assert_eq!(updated.push_name.as_deref(), Some("Sanne"));
        assert!(!updated.is_active);

        assert_eq!(count_active_contacts(db.pool()).await.unwrap(), 1);

        let inactive = get_contacts(
            db.pool(),
            &ContactFilters {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(inactive.total_count, 1);
    }

    #[tokio::test]
    async fn last_seen_on_missing_contact() {
        let db = test_db().await;
        let result = update_last_seen(db.pool(), "missing", &now()).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
