use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use souk_types::api::{Claims, NotificationResponse};
use souk_types::domain::NotificationKind;
use souk_types::time::parse_db_timestamp;

use crate::auth::AppState;
use crate::parse_uuid;

/// The caller's notifications, newest-first. Clients poll this; the server
/// treats it as a plain read with no side effects.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_notifications(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let notifications: Vec<NotificationResponse> = rows
        .into_iter()
        .filter_map(|row| {
            let Some(kind) = NotificationKind::parse(&row.kind) else {
                warn!("Unknown notification kind '{}' on {}", row.kind, row.id);
                return None;
            };
            Some(NotificationResponse {
                id: parse_uuid(&row.id, "notification id"),
                kind,
                body: row.body,
                sender_id: row.sender_id.as_deref().map(|s| parse_uuid(s, "sender id")),
                listing_id: row.listing_id.as_deref().map(|s| parse_uuid(s, "listing id")),
                conversation_id: row.conversation_id,
                read: row.read,
                created_at: parse_db_timestamp(&row.created_at),
            })
        })
        .collect();

    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let updated = state
        .db
        .mark_notification_read(&notification_id.to_string(), &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let deleted = state
        .db
        .delete_notification(&notification_id.to_string(), &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
