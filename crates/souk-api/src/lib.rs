pub mod admin;
pub mod auth;
pub mod favorites;
pub mod listings;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod profile;

use tracing::warn;
use uuid::Uuid;

/// Parse a stored id, logging instead of failing the response on corrupt
/// rows.
pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}
