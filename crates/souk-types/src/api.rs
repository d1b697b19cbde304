use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Condition, ListingStatus, NotificationKind, Role};

// -- JWT Claims --

/// JWT claims shared between the auth handlers that mint tokens and the
/// middleware that validates them. Canonical definition lives here in
/// souk-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub token: String,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub location: String,
    pub condition: Condition,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub location: String,
    pub condition: Condition,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub location: String,
    pub condition: Condition,
    pub image_url: Option<String>,
    pub owner_id: Uuid,
    pub status: ListingStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Whether the requesting viewer has favorited this listing. Always
    /// false for anonymous requests.
    pub favorite: bool,
}

// -- Messaging --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub peer_id: Uuid,
    pub peer_name: String,
    pub unread_count: u32,
    pub last_message_at: chrono::DateTime<chrono::Utc>,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub body: String,
    /// Structured sender reference for `new_message` notifications. Never
    /// derived from the display string.
    pub sender_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub conversation_id: Option<String>,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Profile --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub phone_code: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub phone_public: bool,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    pub phone: Option<String>,
    pub phone_code: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    #[serde(default)]
    pub phone_public: bool,
}

// -- Moderation --

#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub blocked: bool,
    pub role: Role,
    pub listing_count: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ToggleStatusResponse {
    pub id: Uuid,
    pub status: ListingStatus,
}

#[derive(Debug, Serialize)]
pub struct ToggleBlockResponse {
    pub id: Uuid,
    pub blocked: bool,
}

// -- Media upload --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadError {
    pub error: String,
}
