//! Moderation handlers. All routes here sit behind `require_admin`, which
//! checks the caller's role on the user row itself.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use souk_types::api::{AdminUserResponse, ListingResponse, ToggleBlockResponse, ToggleStatusResponse};
use souk_types::domain::Role;
use souk_types::time::parse_db_timestamp;

use crate::auth::AppState;
use crate::listings::listing_response;
use crate::parse_uuid;

pub async fn list_listings(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_all_listings()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let listings: Vec<ListingResponse> =
        rows.into_iter().map(|row| listing_response(row, false)).collect();
    Ok(Json(listings))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_users_with_listing_counts()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let users: Vec<AdminUserResponse> = rows
        .into_iter()
        .map(|row| AdminUserResponse {
            id: parse_uuid(&row.id, "user id"),
            email: row.email,
            display_name: row.display_name,
            blocked: row.blocked,
            role: Role::parse(&row.role).unwrap_or(Role::User),
            listing_count: row.listing_count,
            created_at: parse_db_timestamp(&row.created_at),
        })
        .collect();
    Ok(Json(users))
}

/// Toggle pending <-> approved. The status update and the owner's
/// notification commit together.
pub async fn toggle_listing_status(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let notification_id = Uuid::new_v4();
    let status = state
        .db
        .toggle_listing_status(&listing_id.to_string(), &notification_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    info!("Listing {} moderated to {}", listing_id, status.as_str());
    Ok(Json(ToggleStatusResponse {
        id: listing_id,
        status,
    }))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let deleted = state
        .db
        .delete_listing(&listing_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if deleted {
        info!("Listing {} deleted by moderator", listing_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

pub async fn toggle_user_block(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let blocked = state
        .db
        .toggle_user_blocked(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    info!(
        "User {} {} by moderator",
        user_id,
        if blocked { "blocked" } else { "unblocked" }
    );
    Ok(Json(ToggleBlockResponse {
        id: user_id,
        blocked,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let deleted = state
        .db
        .delete_user(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if deleted {
        info!("User {} deleted by moderator", user_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
