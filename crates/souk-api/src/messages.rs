use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use souk_db::models::NewMessage;
use souk_types::api::{Claims, ConversationSummary, MessageResponse, SendMessageRequest};
use souk_types::domain::{conversation_id, conversation_pair};
use souk_types::time::parse_db_timestamp;

use crate::auth::AppState;
use crate::parse_uuid;

/// Send a message to `peer_id`. The message row, the conversation pointer
/// and the recipient's notification are written in one transaction, so a
/// half-applied "message sent" can't happen.
pub async fn send_message(
    State(state): State<AppState>,
    Path(peer_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.len() > 4000 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if peer_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }

    let message_id = Uuid::new_v4();
    let conversation = conversation_id(claims.sub, peer_id);
    let (user_a, user_b) = conversation_pair(claims.sub, peer_id);

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let sender = claims.sub.to_string();
    let conv = conversation.clone();
    let row = tokio::task::spawn_blocking(move || {
        let caller = db
            .db
            .get_user_by_id(&sender)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;
        if caller.blocked {
            return Err(StatusCode::FORBIDDEN);
        }
        db.db
            .get_user_by_id(&peer_id.to_string())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let msg = NewMessage {
            message_id: message_id.to_string(),
            conversation_id: conv.clone(),
            user_a: user_a.to_string(),
            user_b: user_b.to_string(),
            sender_id: sender.clone(),
            recipient_id: peer_id.to_string(),
            body,
            notification_id: Uuid::new_v4().to_string(),
            notification_body: format!("New message from {}", caller.display_name),
        };
        db.db
            .send_message(&msg)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let messages = db
            .db
            .list_messages(&conv)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        messages
            .into_iter()
            .rfind(|m| m.id == message_id.to_string())
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            conversation_id: conversation,
            sender_id: claims.sub,
            recipient_id: peer_id,
            body: row.body,
            read: row.read,
            created_at: parse_db_timestamp(&row.created_at),
        }),
    ))
}

/// The ordered message sequence with `peer_id`. Opening a conversation
/// marks every unread message addressed to the caller as read before the
/// rows are returned; the peer's own read flags are untouched.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(peer_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let conversation = conversation_id(claims.sub, peer_id);

    let db = state.clone();
    let viewer = claims.sub.to_string();
    let conv = conversation.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db
            .mark_conversation_read(&conv, &viewer)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        db.db
            .list_messages(&conv)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let messages: Vec<MessageResponse> = rows
        .into_iter()
        .map(|row| MessageResponse {
            id: parse_uuid(&row.id, "message id"),
            conversation_id: row.conversation_id,
            sender_id: parse_uuid(&row.sender_id, "sender id"),
            recipient_id: parse_uuid(&row.recipient_id, "recipient id"),
            body: row.body,
            read: row.read,
            created_at: parse_db_timestamp(&row.created_at),
        })
        .collect();

    Ok(Json(messages))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_conversations(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let conversations: Vec<ConversationSummary> = rows
        .into_iter()
        .map(|row| ConversationSummary {
            id: row.id,
            peer_id: parse_uuid(&row.peer_id, "peer id"),
            peer_name: row.peer_name,
            unread_count: row.unread_count,
            last_message_at: parse_db_timestamp(&row.last_message_at),
        })
        .collect();

    Ok(Json(conversations))
}
