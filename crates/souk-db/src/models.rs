//! Database row types, mapping directly to SQLite rows.
//! Distinct from souk-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub phone_code: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub phone_public: bool,
    pub blocked: bool,
    pub role: String,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub location: String,
    pub condition: String,
    pub image_url: Option<String>,
    pub owner_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}

/// One entry of a user's conversation list, peer already resolved.
pub struct ConversationRow {
    pub id: String,
    pub peer_id: String,
    pub peer_name: String,
    pub unread_count: u32,
    pub last_message_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub body: String,
    pub sender_id: Option<String>,
    pub listing_id: Option<String>,
    pub conversation_id: Option<String>,
    pub read: bool,
    pub created_at: String,
}

pub struct AdminUserRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub blocked: bool,
    pub role: String,
    pub listing_count: u32,
    pub created_at: String,
}

/// Store-side feed filters, combined conjunctively. The free-text search
/// term is not here: it is applied in memory after these.
#[derive(Debug, Default, Clone)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    /// Inclusive lower bound on created_at, "YYYY-MM-DD" or full timestamp.
    pub min_date: Option<String>,
    pub condition: Option<String>,
}

/// Everything written by one "message sent" event: the message row, the
/// conversation pointer upsert, and the recipient's notification. Applied
/// in a single transaction.
pub struct NewMessage {
    pub message_id: String,
    pub conversation_id: String,
    pub user_a: String,
    pub user_b: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub notification_id: String,
    pub notification_body: String,
}
