use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Moderation status of a listing. Two states only: a blocked listing goes
/// back to `Pending`, there is no separate "blocked" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Approved,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }

    /// Binary moderation cycle: approving a pending listing and blocking an
    /// approved one are the same toggle.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Approved,
            Self::Approved => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "used" => Some(Self::Used),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    ListingApproved,
    ListingBlocked,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::ListingApproved => "listing_approved",
            Self::ListingBlocked => "listing_blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_message" => Some(Self::NewMessage),
            "listing_approved" => Some(Self::ListingApproved),
            "listing_blocked" => Some(Self::ListingBlocked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The two participants of a conversation in canonical order.
pub fn conversation_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Canonical conversation id for a pair of users. Sorting the ids first
/// guarantees both participants derive the same id no matter who initiates
/// contact.
pub fn conversation_id(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = conversation_pair(a, b);
    format!("{}_{}", lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(conversation_id(a, b), conversation_id(b, a));
    }

    #[test]
    fn conversation_id_decomposes_into_participants() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let id = conversation_id(a, b);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 2);
        let mut expected = vec![a.to_string(), b.to_string()];
        expected.sort();
        assert_eq!(parts, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn status_toggle_is_a_binary_cycle() {
        assert_eq!(ListingStatus::Pending.toggled(), ListingStatus::Approved);
        assert_eq!(ListingStatus::Approved.toggled(), ListingStatus::Pending);
        assert_eq!(ListingStatus::Pending.toggled().toggled(), ListingStatus::Pending);
    }

    #[test]
    fn enums_round_trip_through_db_text() {
        for kind in [
            NotificationKind::NewMessage,
            NotificationKind::ListingApproved,
            NotificationKind::ListingBlocked,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(Condition::parse("used"), Some(Condition::Used));
        assert_eq!(Condition::parse("mint"), None);
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
    }
}
