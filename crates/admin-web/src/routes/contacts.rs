//! Contact management and customer deletion.

use axum::extract::{Path, Query, State};
use axum::Json;
use database::contact::{self, ContactFilters, ContactUpdate, NewContact};
use database::customer;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::routes::conversations::ContactInput;
use crate::routes::whatsapp::non_empty;
use crate::state::AppState;

pub async fn list_contacts(
    State(state): State<AppState>,
    Query(filters): Query<ContactFilters>,
) -> Result<Json<Value>> {
    let page = contact::get_contacts(state.db.pool(), &filters).await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Value>> {
    let phone = non_empty(input.phone_number)
        .ok_or_else(|| ApiError::BadRequest("Phone number is required".to_string()))?;
    let mut new = NewContact::from_phone(&phone)?;
    new.display_name = non_empty(input.display_name);
    new.push_name = non_empty(input.push_name);

    let contact = contact::create_contact(state.db.pool(), &new).await?;
    info!(contact_id = %contact.id, "Contact created");
    Ok(Json(json!({ "success": true, "data": contact })))
}

pub async fn get_contact(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let contact = contact::get_contact(state.db.pool(), &id).await?;
    Ok(Json(json!({ "success": true, "data": contact })))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<Value>> {
    let contact = contact::update_contact(state.db.pool(), &id, &update).await?;
    Ok(Json(json!({ "success": true, "data": contact })))
}

/// Import the WhatsApp session's contacts.
pub async fn sync_contacts(State(state): State<AppState>) -> Result<Json<Value>> {
    let remote = state
        .wasender()?
        .get_contacts()
        .await
        .map_err(|err| ApiError::wasender("Failed to fetch contacts from WASender", err))?;

    let pool = state.db.pool();
    let mut synced = 0usize;
    let mut skipped = 0usize;
    for wa in &remote {
        let digits = wa.phone_digits();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            debug!(id = %wa.id, "Skipping non-phone contact");
            skipped += 1;
            continue;
        }

        let mut new = NewContact::from_jid(&format!("{}@s.whatsapp.net", digits));
        new.push_name = wa.notify.clone();
        new.display_name = wa.name.clone();
        new.verified_name = wa.verified_name.clone();
        new.profile_picture_url = wa.img_url.clone();

        match contact::upsert_contact(pool, &new).await {
            Ok(_) => synced += 1,
            Err(err) => {
                warn!(id = %wa.id, error = %err, "Failed to store synced contact");
                skipped += 1;
            }
        }
    }

    info!(synced, skipped, "Contacts synced from WASender");
    Ok(Json(json!({
        "success": true,
        "data": { "total": remote.len(), "synced": synced, "skipped": skipped },
        "message": format!("Synced {} contacts", synced),
    })))
}

/// Refresh a contact from WASender's profile data.
pub async fn contact_info(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let pool = state.db.pool();
    let stored = contact::get_contact(pool, &id).await?;
    let wasender = state.wasender()?;
    let digits = stored.phone_number.trim_start_matches('+');

    let info = wasender
        .get_contact_info(digits)
        .await
        .map_err(|err| ApiError::wasender("Failed to fetch contact info", err))?;
    let picture = match wasender.get_contact_picture(digits).await {
        Ok(url) => url,
        Err(err) => {
            warn!(contact_id = %id, error = %err, "Profile picture lookup failed");
            None
        }
    };

    let update = ContactUpdate {
        push_name: info.as_ref().and_then(|i| i.notify.clone()),
        verified_name: info.as_ref().and_then(|i| i.verified_name.clone()),
        profile_picture_url: picture.clone(),
        ..Default::default()
    };
    let contact = contact::update_contact(pool, &id, &update).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "contact": contact,
            "whatsapp": info,
            "profile_picture_url": picture,
        },
    })))
}

/// Permanently remove a customer and everything attached to them.
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> Result<Json<Value>> {
    let report = customer::delete_customer(state.db.pool(), &contact_id).await?;
    info!(%contact_id, ?report, "Customer deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Customer and all related data have been permanently deleted",
        "data": report,
    })))
}
