//! Admin account operations.

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::AdminUser;
use crate::validation;
use crate::{new_id, now};

/// Fields for a new admin account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdminUser {
    pub auth_user_id: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "admin".to_string()
}

/// Register an auth-provider user as an admin.
pub async fn create_admin_user(pool: &SqlitePool, new: &NewAdminUser) -> Result<AdminUser> {
    validation::require("auth_user_id", &new.auth_user_id)?;
    validation::validate_email(&new.email)?;

    let id = new_id();
    let stamp = now();

    sqlx::query(
        r#"
        INSERT INTO admin_users (id, auth_user_id, email, role, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.auth_user_id)
    .bind(new.email.trim())
    .bind(&new.role)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "AdminUser", &new.email))?;

    get_admin_user(pool, &id).await
}

/// Get an admin account by ID.
pub async fn get_admin_user(pool: &SqlitePool, id: &str) -> Result<AdminUser> {
    sqlx::query_as::<_, AdminUser>(
        r#"
        SELECT id, auth_user_id, email, role, is_active, created_at, updated_at
        FROM admin_users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "AdminUser",
        id: id.to_string(),
    })
}

/// The active admin account for an auth-provider user, if any.
pub async fn get_active_by_auth_user_id(
    pool: &SqlitePool,
    auth_user_id: &str,
) -> Result<Option<AdminUser>> {
    let admin = sqlx::query_as::<_, AdminUser>(
        r#"
        SELECT id, auth_user_id, email, role, is_active, created_at, updated_at
        FROM admin_users
        WHERE auth_user_id = ? AND is_active = 1
        "#,
    )
    .bind(auth_user_id)
    .fetch_optional(pool)
    .await?;

    Ok(admin)
}

/// List admin accounts, newest first.
pub async fn list_admin_users(pool: &SqlitePool) -> Result<Vec<AdminUser>> {
    let admins = sqlx::query_as::<_, AdminUser>(
        r#"
        SELECT id, auth_user_id, email, role, is_active, created_at, updated_at
        FROM admin_users
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(admins)
}

/// Enable or disable an admin account.
pub async fn set_active(pool: &SqlitePool, id: &str, active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE admin_users
        SET is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(active)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "AdminUser",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    fn new_admin() -> NewAdminUser {
        NewAdminUser {
            auth_user_id: "auth-123".to_string(),
            email: "ops@bargainb.nl".to_string(),
            role: default_role(),
        }
    }

    #[tokio::test]
    async fn active_lookup_follows_flag() {
        let db = test_db().await;
        let admin = create_admin_user(db.pool(), &new_admin()).await.unwrap();
        assert_eq!(admin.role, "admin");

        let found = get_active_by_auth_user_id(db.pool(), "auth-123").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(admin.id.clone()));

        set_active(db.pool(), &admin.id, false).await.unwrap();
        assert!(get_active_by_auth_user_id(db.pool(), "auth-123")
            .await
            .unwrap()
            .is_none());

        assert_eq!(list_admin_users(db.pool()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_duplicates_and_bad_email() {
        let db = test_db().await;
        create_admin_user(db.pool(), &new_admin()).await.unwrap();

        assert!(matches!(
            create_admin_user(db.pool(), &new_admin()).await,
            Err(DatabaseError::AlreadyExists { .. })
        ));

        let bad = NewAdminUser {
            email: "not-an-email".to_string(),
            ..new_admin()
        };
        assert!(matches!(
            create_admin_user(db.pool(), &bad).await,
            Err(DatabaseError::Invalid(_))
        ));

        assert!(matches!(
            set_active(db.pool(), "missing", true).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
